//! Runtime availability of the zstd codec
//!
//! The codec binding is optional (cargo feature `zstd`). Callers ask
//! [`ZstdSupport::is_available`] before dispatching to it. The answer can be
//! memoized in an [`AvailabilityCache`]; caching defaults to on, except inside
//! plugin hosts where the set of linked libraries may change under us.
//!
//! Cache transitions:
//!   DontCache --set(true)--> CachedAvailable | CachedUnavailable
//!   Cached*   --set(false)--> DontCache
//!   Cached*   --set(true)--> unchanged
//!   is_available() never writes the cache.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use zprobe_core::config::CodecConfig;

/// Memoized result of a codec probe
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedAvailability {
    /// Nothing cached; every check probes
    DontCache = 0,
    CachedAvailable = 1,
    CachedUnavailable = 2,
}

impl CachedAvailability {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::CachedAvailable,
            2 => Self::CachedUnavailable,
            _ => Self::DontCache,
        }
    }

    fn from_probe(available: bool) -> Self {
        if available {
            Self::CachedAvailable
        } else {
            Self::CachedUnavailable
        }
    }

    /// The cached answer, if any
    pub fn known(self) -> Option<bool> {
        match self {
            Self::DontCache => None,
            Self::CachedAvailable => Some(true),
            Self::CachedUnavailable => Some(false),
        }
    }
}

/// Single-value, lock-free store for a [`CachedAvailability`]
#[derive(Debug)]
pub struct AvailabilityCache {
    state: AtomicU8,
}

impl AvailabilityCache {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(CachedAvailability::DontCache as u8),
        }
    }

    pub fn load(&self) -> CachedAvailability {
        CachedAvailability::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn clear(&self) {
        self.state
            .store(CachedAvailability::DontCache as u8, Ordering::SeqCst);
    }

    /// Record a probe result if nothing is cached yet.
    ///
    /// Returns the state held afterwards. When two threads race, the first
    /// store wins and the second result is discarded.
    pub fn fill(&self, available: bool) -> CachedAvailability {
        let wanted = CachedAvailability::from_probe(available) as u8;
        match self.state.compare_exchange(
            CachedAvailability::DontCache as u8,
            wanted,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => CachedAvailability::from_u8(wanted),
            Err(current) => CachedAvailability::from_u8(current),
        }
    }
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Asks the host whether the codec entry points are linked and usable.
pub trait CodecProbe: Send + Sync {
    fn probe(&self) -> bool;
}

impl<F> CodecProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn probe(&self) -> bool {
        self()
    }
}

/// Probe backed by the compiled-in libzstd bindings.
///
/// Without the `zstd` feature the codec is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedZstdProbe;

impl CodecProbe for LinkedZstdProbe {
    #[cfg(feature = "zstd")]
    fn probe(&self) -> bool {
        zstd::zstd_safe::version_number() > 0
    }

    #[cfg(not(feature = "zstd"))]
    fn probe(&self) -> bool {
        false
    }
}

/// Facts about the hosting process that pick the default cache mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Running inside a plugin/module host that may swap libraries at runtime
    pub plugin_host: bool,
}

impl HostEnvironment {
    /// Environment variable a plugin host sets for processes it loads
    pub const PLUGIN_HOST_ENV: &'static str = "ZPROBE_PLUGIN_HOST";

    pub fn detect() -> Self {
        Self::from_env_value(std::env::var(Self::PLUGIN_HOST_ENV).ok().as_deref())
    }

    /// Interpret the raw value of [`Self::PLUGIN_HOST_ENV`].
    pub fn from_env_value(value: Option<&str>) -> Self {
        let plugin_host = match value.map(str::trim) {
            None | Some("") => false,
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
        };
        Self { plugin_host }
    }
}

/// Zstd availability detector: a codec probe plus its cache
pub struct ZstdSupport<P = LinkedZstdProbe> {
    probe: P,
    cache: AvailabilityCache,
}

impl<P: CodecProbe> ZstdSupport<P> {
    /// Create a detector with nothing cached.
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            cache: AvailabilityCache::new(),
        }
    }

    /// Create a detector and apply an initial cache mode.
    pub fn with_caching(probe: P, do_cache: bool) -> Self {
        let support = Self::new(probe);
        support.set_cache_availability(do_cache);
        support
    }

    /// Is the zstd codec usable?
    ///
    /// Returns the cached answer when there is one, otherwise probes. Probing
    /// never populates the cache.
    pub fn is_available(&self) -> bool {
        match self.cache.load().known() {
            Some(available) => available,
            None => self.run_probe(),
        }
    }

    /// Turn caching on or off.
    ///
    /// Turning it off always clears the cache. Turning it on probes once if
    /// nothing is cached and leaves an existing answer untouched.
    pub fn set_cache_availability(&self, do_cache: bool) {
        if !do_cache {
            self.cache.clear();
            tracing::debug!("zstd availability cache cleared");
        } else if self.cache.load() == CachedAvailability::DontCache {
            let state = self.cache.fill(self.run_probe());
            tracing::debug!(?state, "zstd availability cached");
        }
    }

    pub fn cached_state(&self) -> CachedAvailability {
        self.cache.load()
    }

    fn run_probe(&self) -> bool {
        // A probe that panics (e.g. a failed symbol lookup) counts as unavailable
        let available =
            panic::catch_unwind(AssertUnwindSafe(|| self.probe.probe())).unwrap_or(false);
        tracing::debug!(available, "probed zstd codec");
        available
    }
}

impl ZstdSupport<LinkedZstdProbe> {
    /// Build the detector for the linked codec, choosing the cache mode from
    /// `config` and the detected host environment.
    pub fn from_config(config: &CodecConfig) -> Self {
        let host = HostEnvironment::detect();
        let do_cache = config.caching_enabled(host.plugin_host);
        tracing::debug!(plugin_host = host.plugin_host, do_cache, "initializing zstd support");
        Self::with_caching(LinkedZstdProbe, do_cache)
    }
}

impl<P> std::fmt::Debug for ZstdSupport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdSupport")
            .field("cache", &self.cache.load())
            .finish_non_exhaustive()
    }
}

static GLOBAL: OnceLock<ZstdSupport> = OnceLock::new();

/// Install the process-wide detector from `config`.
///
/// Returns false if the detector was already initialized (explicitly or by a
/// prior availability check), in which case `config` is ignored.
pub fn init_global(config: &CodecConfig) -> bool {
    let mut installed = false;
    GLOBAL.get_or_init(|| {
        installed = true;
        ZstdSupport::from_config(config)
    });
    installed
}

/// The process-wide detector, initialized with default configuration on first use.
pub fn global() -> &'static ZstdSupport {
    GLOBAL.get_or_init(|| ZstdSupport::from_config(&CodecConfig::default()))
}

/// Are the libraries required for zstd compression available?
pub fn is_zstd_compression_available() -> bool {
    global().is_available()
}

/// Whether to cache the result of the zstd availability check.
///
/// Defaults to false inside a plugin host and true otherwise.
pub fn set_cache_zstd_availability(do_cache: bool) {
    global().set_cache_availability(do_cache);
}
