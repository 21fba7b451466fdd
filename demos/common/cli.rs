use crate::common::{backend::RecorderTy, model::ModelConfigExt};
use burn::record::FileRecorder;
use burn::prelude::*;
use std::path::{Path, PathBuf};

pub const HELP: &str = "\
Burn Tagger Demo

A command-line tool for training and/or running inference with the exercise
models. Configurations and model weights are persisted in an artifacts
directory.

USAGE:
    demo-name [OPTIONS]

When no --training or --inference flag is provided, the program prints this
help after handling configuration logic.

BEHAVIOR OVERVIEW
- If --training-config or --model-config is given, the corresponding config is
  loaded from the specified file and saved to the artifacts directory
  (overwriting any existing file). Otherwise the program attempts to load it
  from the artifacts directory, falling back to a default that is then saved.
- Model weights are loaded from the artifacts directory if present; otherwise
  new ones are created and saved.
- If both --training and --inference are specified, training executes first,
  followed by inference using the trained model.

FLAGS:
    -h, --help                  Show this help message and exit

OPTIONS:
    -t, --training              Run training (creates or updates the model)
    -i, --inference             Run inference, after training when both flags are used
    -r, --remove-artifacts      Delete existing model weights from the artifacts directory
                                before training (has no effect if --training is not used)
    -c, --training-config <PATH>
                                Load the training configuration from this file
    -m, --model-config <PATH>   Load the model configuration from this file
    -a, --artifacts-path <PATH>
                                Directory where configurations and model weights are saved
                                and loaded. Created if missing; defaults to a newly created
                                temporary directory (path will be printed).
    -d, --data <PATH>           Directory holding a labeled corpus (train.jsonl, valid.jsonl).
                                Demos without an external corpus generate data instead.
";

#[derive(Debug)]
pub struct AppArgs {
    pub training: bool,
    pub inference: bool,
    pub remove_artifacts: bool,
    pub training_config: Option<PathBuf>,
    pub model_config: Option<PathBuf>,
    pub artifacts_path: PathBuf,
    pub data_path: Option<PathBuf>,
}

impl AppArgs {
    pub fn parse() -> Result<Self, pico_args::Error> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{}", HELP);
            std::process::exit(0);
        }

        let args = AppArgs {
            training_config: pargs
                .opt_value_from_os_str(["-c", "--training-config"], parse_path)?,
            model_config: pargs.opt_value_from_os_str(["-m", "--model-config"], parse_path)?,
            artifacts_path: pargs
                .opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)?
                .unwrap_or_else(|| {
                    // e.g. /tmp/burn-tagger-ner-tagger-abcd-0
                    let name = format!(
                        "{}-{}-",
                        std::env!("CARGO_PKG_NAME"), // burn-tagger
                        std::env!("CARGO_BIN_NAME")  // e.g. ner-tagger
                    );
                    let tmp = temp_dir::TempDir::with_prefix(name)
                        .expect("Failed to create the temporary directory")
                        .dont_delete_on_drop();
                    let path = tmp.path();
                    println!("new artifacts directory: {path:?}");
                    path.into()
                }),
            data_path: pargs.opt_value_from_os_str(["-d", "--data"], parse_path)?,
            // must parse flags after values
            training: pargs.contains(["-t", "--training"]),
            inference: pargs.contains(["-i", "--inference"]),
            remove_artifacts: pargs.contains(["-r", "--remove-artifacts"]),
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            panic!("unused arguments: {remaining:?}");
        }

        Ok(args)
    }

    pub fn create_artifact_dir(&self) {
        if self.remove_artifacts && self.training {
            // RecorderTy writes `bin` files
            let model = self
                .artifacts_path
                .join(MODEL_NAME)
                .with_added_extension("bin");
            if std::fs::remove_file(&model).is_ok() {
                println!("removed {model:?}");
            }
        }
        std::fs::create_dir_all(&self.artifacts_path).ok();
    }

    pub fn save_training_config(&self, training_config: &impl Config) {
        save_config(&self.config_path(TRAINING_CONFIG_NAME), training_config)
    }

    pub fn load_training_config<TrainingConfig: Config>(&self) -> Option<TrainingConfig> {
        self.training_config
            .as_ref()
            .map(|path| {
                load_config(path).expect("Failed to find the training config file {path:?}")
            })
            .or_else(|| load_config(&self.config_path(TRAINING_CONFIG_NAME)))
    }

    pub fn save_model_config(&self, model_config: &impl Config) {
        save_config(&self.config_path(MODEL_CONFIG_NAME), model_config)
    }

    pub fn load_model_config<B: Backend, ModelConfig: ModelConfigExt<B>>(
        &self,
    ) -> Option<ModelConfig> {
        self.model_config
            .as_ref()
            .map(|path| load_config(path).expect("Failed to find the model config file {path:?}"))
            .or_else(|| load_config(&self.config_path(MODEL_CONFIG_NAME)))
    }

    pub fn save_model<B: Backend>(&self, model: &impl Module<B>) {
        let path = self.artifacts_path.join(MODEL_NAME);
        let file_ext = <RecorderTy as FileRecorder<B>>::file_extension();
        println!("Saving model to {:?}", path.with_added_extension(file_ext));
        model
            .clone()
            .save_file(path, &RecorderTy::new()) // ext added automatically
            .expect("Failed to save the model");
    }

    pub fn load_model<B: Backend, ModelConfig: ModelConfigExt<B>>(
        &self,
        model_config: &ModelConfig,
        device: &B::Device,
    ) -> Option<ModelConfig::Model> {
        let path = self.artifacts_path.join(MODEL_NAME);
        let file_ext = <RecorderTy as FileRecorder<B>>::file_extension();
        let path_ext = path.with_added_extension(file_ext);
        let exists = std::fs::exists(&path_ext).expect("failed to check {path:?}");
        if exists {
            println!("Loading model from {path_ext:?}");
            let model = model_config
                .init(device)
                .load_file(path, &RecorderTy::new(), device) // ext added automatically
                .expect("Failed to load the model");
            Some(model)
        } else {
            None
        }
    }

    pub fn load_or_save_model<B: Backend, ModelConfig: ModelConfigExt<B>>(
        &self,
        model_config: &ModelConfig,
        device: &B::Device,
    ) -> ModelConfig::Model {
        self.load_model(model_config, device).unwrap_or_else(|| {
            println!("Initializing new model");
            let model_init = model_config.init(device);
            self.save_model(&model_init);
            model_init
        })
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.artifacts_path.join(name).with_added_extension("json")
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<std::path::PathBuf, &'static str> {
    Ok(s.into())
}

pub const TRAINING_CONFIG_NAME: &'static str = "training_config";
pub const MODEL_CONFIG_NAME: &'static str = "model_config";
pub const MODEL_NAME: &'static str = "model";

fn save_config(path: &Path, config: &impl Config) {
    println!("Saving config into {path:?}");
    config.save(path).expect("Failed to save the config");
}

fn load_config<C: Config>(path: &Path) -> Option<C> {
    let exists = std::fs::exists(path).expect("failed to check {path:?}");
    if exists {
        println!("Loading config from {path:?}");
        Some(C::load(path).expect("Failed to load the config"))
    } else {
        None
    }
}
