//! Reference ITU-R BS.1770 processing backend
//!
//! [`Bs1770Processor`] implements the [`needles_meter::Processor`] contract:
//! it receives K-weighted planar audio and reports momentary, short-term and
//! gated integrated loudness.
//!
//! Register it with [`register_defaults`] so a meter configured with the
//! default endpoints can find it:
//!
//! ```
//! use needles_meter::ProcessorRegistry;
//!
//! let mut registry = ProcessorRegistry::new();
//! needles_processor::register_defaults(&mut registry);
//! assert!(registry.contains("meter-worker"));
//! ```

mod gating;
mod processor;

pub use gating::{gated_loudness, loudness, ABSOLUTE_GATE_LUFS, RELATIVE_GATE_LU};
pub use processor::{
    channel_weight, Bs1770Processor, MOMENTARY_STEPS, SHORT_TERM_STEPS, STEP_SECONDS,
};

use needles_meter::{
    Processor, ProcessorRegistry, DEFAULT_WORKER_ENDPOINT, DEFAULT_WORKLET_ENDPOINT,
};

/// Register [`Bs1770Processor`] under both default endpoint names
pub fn register_defaults(registry: &mut ProcessorRegistry) {
    for endpoint in [DEFAULT_WORKER_ENDPOINT, DEFAULT_WORKLET_ENDPOINT] {
        registry.register(endpoint, || {
            let processor: Box<dyn Processor> = Box::new(Bs1770Processor::new());
            Ok(processor)
        });
    }
}
