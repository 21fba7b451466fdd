//! A linear-chain conditional random field for sequence labeling.
//!
//! References:
//! - https://github.com/kmkurn/pytorch-crf/blob/8f3203a1f1d7984c87718bfe31853242670258db/torchcrf/__init__.py
//! - Lafferty et al., "Conditional Random Fields: Probabilistic Models for Segmenting and Labeling Sequence Data" (2001)

use crate::utils::log_sum_exp::log_sum_exp;
use burn::module::Param;
use burn::nn::Initializer;
use burn::prelude::*;

/// Configuration to create a [Crf] layer using the [init function](CrfConfig::init).
#[derive(Config, Debug)]
pub struct CrfConfig {
    /// The number of distinct tags.
    pub num_tags: usize,

    /// The initializer for the transition parameters.
    #[config(default = "Initializer::Uniform{min:-0.1, max:0.1}")]
    pub initializer: Initializer,
}

impl CrfConfig {
    /// Returns the initialized layer.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Crf<B> {
        Crf {
            start_transitions: self.initializer.init([self.num_tags], device),
            end_transitions: self.initializer.init([self.num_tags], device),
            transitions: self.initializer.init([self.num_tags, self.num_tags], device),
        }
    }
}

/// Scores tag sequences as
/// `start[t₀] + Σᵢ emit[i, tᵢ] + Σᵢ trans[tᵢ₋₁, tᵢ] + end[tₗ₋₁]`,
/// where masked positions contribute nothing.
///
/// The mask of every sequence must cover position 0 and be a contiguous run
/// (standard trailing padding).
///
/// Should be created using the [CrfConfig] configuration.
#[derive(Module, Debug)]
pub struct Crf<B: Backend> {
    /// Score of starting a sequence with each tag.
    pub start_transitions: Param<Tensor<B, 1>>,
    /// Score of ending a sequence with each tag.
    pub end_transitions: Param<Tensor<B, 1>>,
    /// Score of moving from tag `i` (row) to tag `j` (column).
    pub transitions: Param<Tensor<B, 2>>,
}

impl<B: Backend> Crf<B> {
    /// Mean negative log-likelihood of the given tag sequences.
    ///
    /// # Shapes
    ///   - emissions [batch, sequence, num_tags]
    ///   - tags [batch, sequence]
    ///   - mask [batch, sequence]
    ///   - Output [1]
    pub fn forward(
        &self,
        emissions: Tensor<B, 3>,
        tags: Tensor<B, 2, Int>,
        mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 1> {
        let numerator = self.score(emissions.clone(), tags, mask.clone());
        let denominator = self.partition(emissions, mask);
        (denominator - numerator).mean()
    }

    /// Joint score of the given tag paths.
    ///
    /// # Shapes
    ///   - emissions [batch, sequence, num_tags]
    ///   - tags [batch, sequence]
    ///   - mask [batch, sequence]
    ///   - Output [batch]
    fn score(
        &self,
        emissions: Tensor<B, 3>,
        tags: Tensor<B, 2, Int>,
        mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 1> {
        let [batch, sequence, _num_tags] = emissions.dims();

        let first_tags: Tensor<B, 1, Int> = tags.clone().narrow(1, 0, 1).squeeze(1);
        let mut score = self.start_transitions.val().select(0, first_tags.clone())
            + gather_tag(emissions.clone().narrow(1, 0, 1).squeeze(1), &first_tags);

        let mut prev_tags = first_tags;
        for step in 1..sequence {
            let step_tags: Tensor<B, 1, Int> = tags.clone().narrow(1, step, 1).squeeze(1);
            let step_mask: Tensor<B, 1> = mask.clone().narrow(1, step, 1).squeeze(1).float();

            let emit = gather_tag(
                emissions.clone().narrow(1, step, 1).squeeze(1),
                &step_tags,
            );
            let trans = gather_tag(self.transitions.val().select(0, prev_tags), &step_tags);
            score = score + (emit + trans) * step_mask;
            prev_tags = step_tags;
        }

        let last_index = mask.int().sum_dim(1) - 1;
        let last_tags: Tensor<B, 1, Int> = tags.gather(1, last_index).squeeze(1);
        debug_assert_eq!([batch], last_tags.dims());

        score + self.end_transitions.val().select(0, last_tags)
    }

    /// Log-partition over all tag paths, via the forward algorithm.
    ///
    /// # Shapes
    ///   - emissions [batch, sequence, num_tags]
    ///   - mask [batch, sequence]
    ///   - Output [batch]
    fn partition(&self, emissions: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Tensor<B, 1> {
        let [batch, sequence, num_tags] = emissions.dims();

        // alpha[b, j]: log-score of every prefix ending in tag j
        let mut alpha: Tensor<B, 2> = self.start_transitions.val().unsqueeze()
            + emissions.clone().narrow(1, 0, 1).squeeze(1);

        for step in 1..sequence {
            // [batch, prev, next]
            let next = alpha.clone().unsqueeze_dim(2)
                + self.transitions.val().unsqueeze()
                + emissions.clone().narrow(1, step, 1);
            let next = log_sum_exp(next, 1).reshape([batch, num_tags]);

            let step_mask = mask.clone().narrow(1, step, 1).expand([batch, num_tags]);
            alpha = alpha.mask_where(step_mask, next);
        }

        let alpha = alpha + self.end_transitions.val().unsqueeze();
        log_sum_exp(alpha, 1).reshape([batch])
    }

    /// Most likely tag path for each sequence, via Viterbi decoding.
    ///
    /// Each returned path has exactly the masked length of its sequence.
    ///
    /// # Shapes
    ///   - emissions [batch, sequence, num_tags]
    ///   - mask [batch, sequence]
    pub fn decode(&self, emissions: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Vec<Vec<usize>> {
        let [batch, sequence, num_tags] = emissions.dims();

        let mut score: Tensor<B, 2> = self.start_transitions.val().unsqueeze()
            + emissions.clone().narrow(1, 0, 1).squeeze(1);
        // backpointers of each step, flattened as [batch * num_tags]
        let mut history: Vec<Vec<i64>> = Vec::with_capacity(sequence.saturating_sub(1));

        for step in 1..sequence {
            // [batch, prev, next]
            let broadcast: Tensor<B, 3> =
                score.clone().unsqueeze_dim(2) + self.transitions.val().unsqueeze();
            let (best, indices) = broadcast.max_dim_with_indices(1);
            let best = best.reshape([batch, num_tags])
                + emissions.clone().narrow(1, step, 1).squeeze(1);

            let step_mask = mask.clone().narrow(1, step, 1).expand([batch, num_tags]);
            score = score.mask_where(step_mask, best);
            history.push(
                indices
                    .reshape([batch * num_tags])
                    .into_data()
                    .iter::<i64>()
                    .collect(),
            );
        }

        let score = score + self.end_transitions.val().unsqueeze();
        let best_last: Vec<i64> = score
            .argmax(1)
            .reshape([batch])
            .into_data()
            .iter::<i64>()
            .collect();
        let lengths: Vec<i64> = mask
            .int()
            .sum_dim(1)
            .reshape([batch])
            .into_data()
            .iter::<i64>()
            .collect();

        let mut paths = Vec::with_capacity(batch);
        for b in 0..batch {
            let length = lengths[b] as usize;
            if length == 0 {
                paths.push(Vec::new());
                continue;
            }

            let mut tag = best_last[b] as usize;
            let mut path = Vec::with_capacity(length);
            path.push(tag);
            for step in (1..length).rev() {
                tag = history[step - 1][b * num_tags + tag] as usize;
                path.push(tag);
            }
            path.reverse();
            paths.push(path);
        }
        paths
    }
}

/// # Shapes
///   - scores [batch, num_tags]
///   - tags [batch]
///   - Output [batch]
fn gather_tag<B: Backend>(scores: Tensor<B, 2>, tags: &Tensor<B, 1, Int>) -> Tensor<B, 1> {
    scores
        .gather(1, tags.clone().unsqueeze_dim(1))
        .squeeze(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type B = burn::backend::NdArray;

    const NUM_TAGS: usize = 3;
    const SEQUENCE: usize = 3;

    struct Fixture {
        crf: Crf<B>,
        emissions: Tensor<B, 3>,
        // flattened copies for the reference computation
        emit: Vec<f32>,
        start: Vec<f32>,
        end: Vec<f32>,
        trans: Vec<f32>,
    }

    fn fixture(batch: usize) -> Fixture {
        let device = Default::default();
        let crf = CrfConfig::new(NUM_TAGS).init::<B>(&device);
        let emissions = Tensor::<B, 3>::random(
            [batch, SEQUENCE, NUM_TAGS],
            Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        Fixture {
            emit: emissions.clone().into_data().iter::<f32>().collect(),
            start: crf.start_transitions.val().into_data().iter::<f32>().collect(),
            end: crf.end_transitions.val().into_data().iter::<f32>().collect(),
            trans: crf.transitions.val().into_data().iter::<f32>().collect(),
            crf,
            emissions,
        }
    }

    impl Fixture {
        fn path_score(&self, b: usize, path: &[usize]) -> f32 {
            let emit = |i: usize, tag: usize| self.emit[(b * SEQUENCE + i) * NUM_TAGS + tag];

            let mut score = self.start[path[0]] + emit(0, path[0]);
            for i in 1..path.len() {
                score += self.trans[path[i - 1] * NUM_TAGS + path[i]] + emit(i, path[i]);
            }
            score + self.end[path[path.len() - 1]]
        }

        fn all_paths(&self, length: usize) -> Vec<Vec<usize>> {
            let mut paths = vec![vec![]];
            for _ in 0..length {
                paths = paths
                    .into_iter()
                    .flat_map(|p| {
                        (0..NUM_TAGS).map(move |tag| {
                            let mut p = p.clone();
                            p.push(tag);
                            p
                        })
                    })
                    .collect();
            }
            paths
        }

        fn log_partition(&self, b: usize, length: usize) -> f32 {
            let scores: Vec<f32> = self
                .all_paths(length)
                .iter()
                .map(|p| self.path_score(b, p))
                .collect();
            let max = scores.iter().cloned().fold(f32::MIN, f32::max);
            max + scores.iter().map(|s| (s - max).exp()).sum::<f32>().ln()
        }
    }

    fn mask(rows: [[i32; SEQUENCE]; 2]) -> Tensor<B, 2, Bool> {
        Tensor::<B, 2, Int>::from_ints(rows, &Default::default()).bool()
    }

    #[test]
    fn nll_matches_brute_force_enumeration() {
        let f = fixture(2);
        let tags = Tensor::<B, 2, Int>::from_ints([[0, 2, 1], [1, 0, 0]], &Default::default());
        let mask = mask([[1, 1, 1], [1, 1, 0]]);

        let got = f.crf.forward(f.emissions.clone(), tags, mask).into_scalar();
        let expected = ((f.log_partition(0, 3) - f.path_score(0, &[0, 2, 1]))
            + (f.log_partition(1, 2) - f.path_score(1, &[1, 0])))
            / 2.0;
        assert!((got - expected).abs() < 1e-4, "{got} vs {expected}");
    }

    #[test]
    fn decode_matches_brute_force_argmax() {
        let f = fixture(2);
        let mask = mask([[1, 1, 1], [1, 1, 0]]);

        let got = f.crf.decode(f.emissions.clone(), mask);

        for (b, length) in [(0, 3), (1, 2)] {
            let best = f
                .all_paths(length)
                .into_iter()
                .max_by(|a, b_| {
                    f.path_score(b, a)
                        .partial_cmp(&f.path_score(b, b_))
                        .unwrap()
                })
                .unwrap();
            assert_eq!(got[b], best, "batch element {b}");
        }
    }

    #[test]
    fn decoded_paths_have_masked_lengths() {
        let f = fixture(2);
        let got = f.crf.decode(f.emissions.clone(), mask([[1, 1, 0], [1, 0, 0]]));

        assert_eq!(got[0].len(), 2);
        assert_eq!(got[1].len(), 1);
        assert!(got.iter().flatten().all(|&tag| tag < NUM_TAGS));
    }

    #[test]
    fn trailing_padding_does_not_change_the_score() {
        let device = Default::default();
        let crf = CrfConfig::new(NUM_TAGS).init::<B>(&device);
        let emissions =
            Tensor::<B, 3>::random([1, 2, NUM_TAGS], Distribution::Uniform(-1.0, 1.0), &device);
        let padded = Tensor::cat(
            vec![
                emissions.clone(),
                Tensor::<B, 3>::random([1, 1, NUM_TAGS], Distribution::Uniform(5.0, 9.0), &device),
            ],
            1,
        );

        let tags = Tensor::<B, 2, Int>::from_ints([[2, 0]], &device);
        let tags_padded = Tensor::<B, 2, Int>::from_ints([[2, 0, 0]], &device);
        let full = Tensor::<B, 2, Int>::from_ints([[1, 1]], &device).bool();
        let partial = Tensor::<B, 2, Int>::from_ints([[1, 1, 0]], &device).bool();

        let plain = crf
            .forward(emissions.clone(), tags, full.clone())
            .into_scalar();
        let masked = crf
            .forward(padded.clone(), tags_padded, partial.clone())
            .into_scalar();
        assert!((plain - masked).abs() < 1e-5, "{plain} vs {masked}");

        assert_eq!(crf.decode(emissions, full), crf.decode(padded, partial));
    }
}
