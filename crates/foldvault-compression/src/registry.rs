//! Strategy registry
//!
//! Owns one codec per [`StrategyId`]. Construction runs every codec over a
//! fixed sample corpus and drops the ones that fail to round-trip, so the
//! selector only ever sees codecs that have proven reversible.

use crate::algorithms::{AlgorithmImpl, Codec};
use foldvault_types::{CodecConfig, Error, Result, StrategyId};
use std::fmt;
use tracing::{debug, warn};

/// Codec registry keyed by strategy
pub struct StrategyRegistry {
    codecs: Vec<Box<dyn Codec>>,
    excluded: Vec<(StrategyId, String)>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.strategies())
            .field("excluded", &self.excluded)
            .finish()
    }
}

impl StrategyRegistry {
    /// Build the registry for every known strategy
    pub fn new(config: &CodecConfig) -> Self {
        let codecs = AlgorithmImpl::all_strategies()
            .into_iter()
            .map(|strategy| AlgorithmImpl::create(strategy, config))
            .collect();
        Self::from_codecs(codecs)
    }

    /// Build a registry from explicit codecs, self-checking each one
    ///
    /// Passthrough is always present; it is added when missing.
    pub fn from_codecs(candidates: Vec<Box<dyn Codec>>) -> Self {
        let mut codecs: Vec<Box<dyn Codec>> = Vec::with_capacity(candidates.len());
        let mut excluded = Vec::new();

        for codec in candidates {
            let strategy = codec.id();
            if codecs.iter().any(|c| c.id() == strategy) {
                warn!("Duplicate codec for strategy {} ignored", strategy);
                continue;
            }
            match self_check(codec.as_ref()) {
                Ok(()) => {
                    debug!("Registered strategy {}", strategy);
                    codecs.push(codec);
                }
                Err(e) => {
                    warn!("Strategy {} failed self-check and is excluded: {}", strategy, e);
                    excluded.push((strategy, e.to_string()));
                }
            }
        }

        if !codecs.iter().any(|c| c.id().is_passthrough()) {
            codecs.insert(0, AlgorithmImpl::create(StrategyId::Passthrough, &CodecConfig::default()));
        }

        Self { codecs, excluded }
    }

    /// Codec for `strategy`, if registered
    pub fn get(&self, strategy: StrategyId) -> Option<&dyn Codec> {
        self.codecs
            .iter()
            .find(|c| c.id() == strategy)
            .map(AsRef::as_ref)
    }

    /// Codec for `strategy` or [`Error::UnsupportedStrategy`]
    pub fn require(&self, strategy: StrategyId) -> Result<&dyn Codec> {
        self.get(strategy)
            .ok_or_else(|| Error::unsupported_strategy(strategy.as_str()))
    }

    /// Registered codecs in registration order
    pub fn codecs(&self) -> impl Iterator<Item = &dyn Codec> {
        self.codecs.iter().map(AsRef::as_ref)
    }

    /// Registered strategies in registration order
    pub fn strategies(&self) -> Vec<StrategyId> {
        self.codecs.iter().map(|c| c.id()).collect()
    }

    /// Strategies dropped by the self-check with the reason
    pub fn excluded(&self) -> &[(StrategyId, String)] {
        &self.excluded
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

fn check_corpus() -> Vec<Vec<u8>> {
    let mut lcg = 0x2545_F491_u32;
    let noise: Vec<u8> = (0..512)
        .map(|_| {
            lcg = lcg.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (lcg >> 16) as u8
        })
        .collect();

    vec![
        Vec::new(),
        vec![0x41],
        vec![0u8; 300],
        b"abababababab\0\0\0\0xyzxyzxyz".repeat(12),
        b"pub fn measure(input: &[u8]) -> usize { input.len() }\n".repeat(8),
        (0..=255u8).collect(),
        noise,
    ]
}

/// Round-trip the sample corpus through `codec`
///
/// Applicability is ignored here: a codec must be reversible on any input it
/// is handed, even content it would never be selected for.
fn self_check(codec: &dyn Codec) -> Result<()> {
    for (i, sample) in check_corpus().iter().enumerate() {
        let encoded = codec.encode(sample)?;
        let decoded = codec.decode(&encoded)?;
        if decoded != *sample {
            return Err(Error::strategy_failure(
                codec.id().as_str(),
                format!("sample {} did not round-trip", i),
            ));
        }
    }
    Ok(())
}
