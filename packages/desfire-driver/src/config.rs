//! Construction-time session configuration (§6, §9 open questions).
//! There is no file/env configuration surface in the core; every knob
//! is a field here, set once at `open_session` and immutable for the
//! life of the session.

use desfire_commands::commands::LegacyIvSeed;
use typed_builder::TypedBuilder;

/// Whether the AES CMAC seed includes a command counter that advances
/// per exchange, or stays constant zero (§9: "must be confirmed
/// against the target card variant").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandCounterPolicy {
    #[default]
    ConstantZero,
    AdvancePerExchange,
}

/// Whether `SetConfiguration`'s ATS payload length includes its own TL
/// byte (§9 open question; spec defaults to "TL included").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtsLengthConvention {
    TlIncluded,
    TlExcluded,
}

impl Default for AtsLengthConvention {
    fn default() -> Self {
        Self::TlIncluded
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SessionConfig {
    #[builder(default)]
    pub command_counter_policy: CommandCounterPolicy,
    #[builder(default)]
    pub ats_length_convention: AtsLengthConvention,
    /// Which IV a legacy DES `ChangeKey` continuation frame is
    /// encrypted under; both are observed in practice (§9 open
    /// question).
    #[builder(default)]
    pub legacy_change_key_iv_seed: LegacyIvSeed,
    /// Deadline handed to `Transceiver::transceive` for every frame
    /// (§5 "Cancellation & timeouts"). One deadline per exchange, not
    /// per multi-frame command: a chunked read still gets this budget
    /// on each of its frames.
    #[builder(default = 500)]
    pub command_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
