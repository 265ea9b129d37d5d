//! The geometric encoder: stacked multi-head attention message passing
//! over a neighbor graph.
//!
//! Each layer updates an atom's state from its own state and its
//! current-hop neighbors only, so the receptive field grows by one hop per
//! layer and per-layer cost stays linear in the edge count. Geometric
//! signals enter the attention logits through two channels scaled by
//! `s_eu` (radial) and `s_a` (angular) to keep them on comparable numeric
//! ranges regardless of the absolute cutoff magnitude.

use ndarray::{s, Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::error::Error;
use super::head::{
    BackmappingHead, EnergyKernelHead, HeadOutput, InitPolicy, ModelType, VariantHead,
};
use super::layers::{silu, softmax_in_place, LayerNorm, Linear};
use crate::graph::NeighborGraph;
use crate::model::{Element, Structure};

/// Architecture hyperparameters for the encoder.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub model_type: ModelType,
    pub hidden_dim: usize,
    pub ffn_dim: usize,
    pub rbf_dim: usize,
    pub expand_embed_dim: usize,
    pub heads: usize,
    pub layers: usize,
    /// Scale of the radial (Euclidean distance) attention channel.
    pub s_eu: f64,
    /// Scale of the angular attention channel.
    pub s_a: f64,
    /// Energy-kernel temperature; defaults to 1.0 when absent.
    pub temperature: Option<f64>,
    pub init: InitPolicy,
}

impl EncoderConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.hidden_dim == 0 || self.heads == 0 || self.hidden_dim % self.heads != 0 {
            return Err(Error::InvalidWidth {
                hidden_dim: self.hidden_dim,
                heads: self.heads,
            });
        }
        if self.layers == 0 {
            return Err(Error::NonPositive { field: "layers" });
        }
        if self.ffn_dim == 0 {
            return Err(Error::NonPositive { field: "ffn_dim" });
        }
        if self.rbf_dim == 0 {
            return Err(Error::NonPositive { field: "rbf_dim" });
        }
        if self.expand_embed_dim == 0 {
            return Err(Error::NonPositive {
                field: "expand_embed_dim",
            });
        }
        if matches!(self.temperature, Some(t) if t <= 0.0) {
            return Err(Error::NonPositive {
                field: "temperature",
            });
        }
        Ok(())
    }
}

/// One attention + feed-forward round.
struct AttentionLayer {
    heads: usize,
    head_dim: usize,
    s_eu: f64,
    s_a: f64,
    wq: Linear,
    wk: Linear,
    wv: Linear,
    wo: Linear,
    /// Projects expanded edge features into the key space.
    edge_key: Linear,
    /// Per-head weights over the raw radial basis (distance channel).
    dist_weight: Array2<f64>,
    /// Per-head weight of the angular channel.
    ang_weight: Array1<f64>,
    norm_attn: LayerNorm,
    norm_ffn: LayerNorm,
    ffn_in: Linear,
    ffn_out: Linear,
}

impl AttentionLayer {
    fn init(config: &EncoderConfig, rng: &mut ChaCha8Rng) -> Self {
        let hidden = config.hidden_dim;
        Self {
            heads: config.heads,
            head_dim: hidden / config.heads,
            s_eu: config.s_eu,
            s_a: config.s_a,
            wq: Linear::init(hidden, hidden, rng),
            wk: Linear::init(hidden, hidden, rng),
            wv: Linear::init(hidden, hidden, rng),
            wo: Linear::init(hidden, hidden, rng),
            edge_key: Linear::init(config.expand_embed_dim, hidden, rng),
            dist_weight: Array2::from_shape_fn((config.heads, config.rbf_dim), |_| {
                rng.gen_range(-0.1..0.1)
            }),
            ang_weight: Array1::from_shape_fn(config.heads, |_| rng.gen_range(-0.1..0.1)),
            norm_attn: LayerNorm::new(hidden),
            norm_ffn: LayerNorm::new(hidden),
            ffn_in: Linear::init(hidden, config.ffn_dim, rng),
            ffn_out: Linear::init(config.ffn_dim, hidden, rng),
        }
    }

    fn forward(
        &self,
        states: &Array2<f64>,
        graph: &NeighborGraph,
        edge_embed: &Array2<f64>,
        edge_rbf: &Array2<f64>,
        angular: &Array1<f64>,
    ) -> Array2<f64> {
        let n_atoms = states.nrows();
        let hidden = states.ncols();
        let scale = 1.0 / (self.head_dim as f64).sqrt();

        let q = self.wq.forward(states);
        let k = self.wk.forward(states);
        let v = self.wv.forward(states);
        let edge_k = self.edge_key.forward(edge_embed);

        let mut messages = Array2::zeros((n_atoms, hidden));
        for atom in 0..n_atoms {
            let range = graph.edge_range(atom);
            let edges = graph.out_edges(atom);
            if edges.is_empty() {
                continue;
            }
            for head in 0..self.heads {
                let cols = head * self.head_dim..(head + 1) * self.head_dim;
                let q_head = q.slice(s![atom, cols.clone()]);

                let mut logits = Vec::with_capacity(edges.len());
                for (offset, edge) in edges.iter().enumerate() {
                    let row = range.start + offset;
                    let k_head = k.slice(s![edge.dst, cols.clone()]);
                    let ek_head = edge_k.slice(s![row, cols.clone()]);
                    let content: f64 = q_head
                        .iter()
                        .zip(k_head.iter().zip(ek_head.iter()))
                        .map(|(&qv, (&kv, &ev))| qv * (kv + ev))
                        .sum();
                    let radial = self.s_eu * edge_rbf.row(row).dot(&self.dist_weight.row(head));
                    let ang = self.s_a * self.ang_weight[head] * angular[row];
                    logits.push(content * scale + radial + ang);
                }
                softmax_in_place(&mut logits);

                for (offset, edge) in edges.iter().enumerate() {
                    let weight = logits[offset];
                    let v_head = v.slice(s![edge.dst, cols.clone()]);
                    let mut out = messages.slice_mut(s![atom, cols.clone()]);
                    out.zip_mut_with(&v_head, |acc, &value| *acc += weight * value);
                }
            }
        }

        let attended = self.norm_attn.forward(&(states + &self.wo.forward(&messages)));
        let ffn = self.ffn_out.forward(&silu(&self.ffn_in.forward(&attended)));
        let summed = &attended + &ffn;
        self.norm_ffn.forward(&summed)
    }
}

/// Per-structure encoder output.
#[derive(Debug, Clone)]
pub struct EncodedStructure {
    /// Final per-atom hidden states, `[n_atoms, hidden_dim]`.
    pub atom_states: Array2<f64>,
    /// Variant head output.
    pub output: HeadOutput,
}

/// Multi-layer geometric attention encoder over neighbor graphs.
///
/// Forward-only: produces embeddings, never gradients. Two encoders built
/// from the same configuration and seed produce identical outputs.
pub struct GeometricEncoder {
    config: EncoderConfig,
    element_embed: Array2<f64>,
    expand: Linear,
    layers: Vec<AttentionLayer>,
    head: Box<dyn VariantHead>,
}

impl GeometricEncoder {
    pub fn new(config: EncoderConfig, seed: u64) -> Result<Self, Error> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let element_embed = Array2::from_shape_fn(
            (Element::MAX_ATOMIC_NUMBER + 1, config.hidden_dim),
            |_| rng.gen_range(-0.1..0.1),
        );
        let expand = Linear::init(config.rbf_dim, config.expand_embed_dim, &mut rng);
        let layers = (0..config.layers)
            .map(|_| AttentionLayer::init(&config, &mut rng))
            .collect();
        let head: Box<dyn VariantHead> = match config.model_type {
            ModelType::EKernel => Box::new(EnergyKernelHead::init(
                config.hidden_dim,
                config.temperature.unwrap_or(1.0),
                &mut rng,
            )),
            ModelType::Backmapping => {
                Box::new(BackmappingHead::init(config.hidden_dim, &mut rng))
            }
        };

        Ok(Self {
            config,
            element_embed,
            expand,
            layers,
            head,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn model_type(&self) -> ModelType {
        self.config.model_type
    }

    pub fn init_policy(&self) -> &InitPolicy {
        &self.config.init
    }

    pub fn head(&self) -> &dyn VariantHead {
        self.head.as_ref()
    }

    /// Encodes one structure given its neighbor graph and the radial
    /// expansion of the graph's edges (`[edge_count, rbf_dim]`).
    pub fn encode(
        &self,
        structure: &Structure,
        graph: &NeighborGraph,
        edge_rbf: &Array2<f64>,
    ) -> Result<EncodedStructure, Error> {
        if edge_rbf.nrows() != graph.edge_count() || edge_rbf.ncols() != self.config.rbf_dim {
            return Err(Error::FeatureShape {
                expected: graph.edge_count(),
                expected_dim: self.config.rbf_dim,
                got: edge_rbf.nrows(),
                got_dim: edge_rbf.ncols(),
            });
        }

        let mut states = Array2::zeros((graph.n_atoms(), self.config.hidden_dim));
        for (row, atom) in structure.atoms.iter().enumerate() {
            states
                .row_mut(row)
                .assign(&self.element_embed.row(atom.element.atomic_number() as usize));
        }

        let edge_embed = silu(&self.expand.forward(edge_rbf));
        let angular = angular_features(graph);

        for layer in &self.layers {
            states = layer.forward(&states, graph, &edge_embed, edge_rbf, &angular);
        }

        let pooled = states
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.config.hidden_dim));
        let output = self.head.forward(&states, &pooled);

        Ok(EncodedStructure {
            atom_states: states,
            output,
        })
    }
}

/// Per-edge angular descriptor: the cosine between an edge's direction and
/// the mean outgoing direction of its source atom. Zero when either is
/// degenerate.
fn angular_features(graph: &NeighborGraph) -> Array1<f64> {
    let mut angular = Array1::zeros(graph.edge_count());
    for atom in 0..graph.n_atoms() {
        let range = graph.edge_range(atom);
        let edges = graph.out_edges(atom);
        if edges.is_empty() {
            continue;
        }

        let mut mean = [0.0f64; 3];
        for edge in edges {
            if edge.distance > 0.0 {
                for c in 0..3 {
                    mean[c] += edge.vector[c] / edge.distance;
                }
            }
        }
        let mean_norm = (mean[0] * mean[0] + mean[1] * mean[1] + mean[2] * mean[2]).sqrt();
        if mean_norm < 1e-12 {
            continue;
        }

        for (offset, edge) in edges.iter().enumerate() {
            if edge.distance > 0.0 {
                let dot = edge.vector[0] * mean[0]
                    + edge.vector[1] * mean[1]
                    + edge.vector[2] * mean[2];
                angular[range.start + offset] = dot / (edge.distance * mean_norm);
            }
        }
    }
    angular
}
