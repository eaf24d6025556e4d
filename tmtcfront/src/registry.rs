//! Processor registry
//!
//! Links name the processor they want in the configuration file. The
//! registry maps those names to factories, so a deployment can add its own
//! processors without touching the link code.

use std::collections::BTreeMap;
use std::sync::Arc;

use tmtclibgs::{CommandHistorySink, EventSink, ProcessorConfig, TmtcError, TmtcResult};

use crate::postprocessor::{CcsdsPostprocessor, CommandPostprocessor};
use crate::preprocessor::{CcsdsPreprocessor, PacketPreprocessor, TimestampStrategy};

/// CCSDS packets with only a primary header, stamped with receipt time
pub const CCSDS_PRIMARY: &str = "ccsds-primary";

/// CCSDS packets with a 4-byte mission-elapsed time secondary header
pub const CCSDS_TIME_TAGGED: &str = "ccsds-time-tagged";

/// CCSDS commands with length and sequence count patching
pub const CCSDS_SEQCOUNT: &str = "ccsds-seqcount";

pub type PreprocessorFactory =
    fn(&ProcessorConfig, Arc<dyn EventSink>) -> TmtcResult<Box<dyn PacketPreprocessor>>;

pub type PostprocessorFactory =
    fn(&ProcessorConfig, Arc<dyn CommandHistorySink>) -> TmtcResult<Box<dyn CommandPostprocessor>>;

fn build_ccsds(
    config: &ProcessorConfig,
    strategy: TimestampStrategy,
    events: Arc<dyn EventSink>,
) -> TmtcResult<Box<dyn PacketPreprocessor>> {
    let mut preprocessor = CcsdsPreprocessor::new(config.link.clone(), strategy, events);
    if let Some(length) = config.min_frame_length {
        preprocessor = preprocessor.with_min_frame_length(length)?;
    }
    Ok(Box::new(preprocessor))
}

fn ccsds_primary(config: &ProcessorConfig, events: Arc<dyn EventSink>) -> TmtcResult<Box<dyn PacketPreprocessor>> {
    build_ccsds(config, TimestampStrategy::WallClock, events)
}

fn ccsds_time_tagged(config: &ProcessorConfig, events: Arc<dyn EventSink>) -> TmtcResult<Box<dyn PacketPreprocessor>> {
    build_ccsds(config, TimestampStrategy::MissionElapsed(config.mission_epoch), events)
}

fn ccsds_seqcount(
    config: &ProcessorConfig,
    history: Arc<dyn CommandHistorySink>,
) -> TmtcResult<Box<dyn CommandPostprocessor>> {
    Ok(Box::new(CcsdsPostprocessor::new(config.link.clone(), history)))
}

/// Named processor factories
pub struct ProcessorRegistry {
    preprocessors: BTreeMap<String, PreprocessorFactory>,
    postprocessors: BTreeMap<String, PostprocessorFactory>,
}

impl ProcessorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            preprocessors: BTreeMap::new(),
            postprocessors: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in CCSDS processors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.preprocessors.insert(CCSDS_PRIMARY.to_string(), ccsds_primary);
        registry.preprocessors.insert(CCSDS_TIME_TAGGED.to_string(), ccsds_time_tagged);
        registry.postprocessors.insert(CCSDS_SEQCOUNT.to_string(), ccsds_seqcount);
        registry
    }

    pub fn register_preprocessor(&mut self, name: &str, factory: PreprocessorFactory) -> TmtcResult<()> {
        if self.preprocessors.contains_key(name) {
            return Err(TmtcError::config(format!("Preprocessor {} already registered", name)));
        }
        self.preprocessors.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn register_postprocessor(&mut self, name: &str, factory: PostprocessorFactory) -> TmtcResult<()> {
        if self.postprocessors.contains_key(name) {
            return Err(TmtcError::config(format!("Postprocessor {} already registered", name)));
        }
        self.postprocessors.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn build_preprocessor(
        &self,
        config: &ProcessorConfig,
        events: Arc<dyn EventSink>,
    ) -> TmtcResult<Box<dyn PacketPreprocessor>> {
        let factory = self
            .preprocessors
            .get(&config.name)
            .ok_or_else(|| TmtcError::UnknownProcessor(config.name.clone()))?;
        factory(config, events)
    }

    pub fn build_postprocessor(
        &self,
        config: &ProcessorConfig,
        history: Arc<dyn CommandHistorySink>,
    ) -> TmtcResult<Box<dyn CommandPostprocessor>> {
        let factory = self
            .postprocessors
            .get(&config.name)
            .ok_or_else(|| TmtcError::UnknownProcessor(config.name.clone()))?;
        factory(config, history)
    }

    pub fn preprocessor_names(&self) -> Vec<&str> {
        self.preprocessors.keys().map(String::as_str).collect()
    }

    pub fn postprocessor_names(&self) -> Vec<&str> {
        self.postprocessors.keys().map(String::as_str).collect()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
