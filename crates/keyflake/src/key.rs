#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, GeneratorConfig, IdState, Identifier, Layout, LockSnowflakeGenerator, Result,
    SnowflakeGenerator, SnowflakeId, SystemClock, TimeSource, WorkerIdProvider,
    generator::{GeneratorState, RwLock, Rules, mutex},
    worker::WorkerSlot,
};

/// Cluster-wide key generator for one process.
///
/// A `KeyGenerator` starts without a worker ID; every generation call fails
/// with [`Error::UnboundWorkerId`] until [`bind`] (or [`bind_with`]) succeeds.
/// Generation calls share a read lock and serialize on the underlying
/// [`LockSnowflakeGenerator`]; binding takes the write lock, so no call ever
/// observes a half-applied worker ID.
///
/// # Example
///
/// ```
/// use keyflake::{GeneratorConfig, KeyGenerator};
///
/// let keys = KeyGenerator::from_config(GeneratorConfig::default()).unwrap();
/// assert!(keys.generate().is_err());
///
/// keys.bind(7).unwrap();
/// let ids = keys.generate_batch(3).unwrap();
/// assert!(ids.windows(2).all(|w| w[0] < w[1]));
/// assert_eq!(keys.decode(ids[0]).unwrap().machine_id, 7);
/// ```
///
/// [`bind`]: Self::bind
/// [`bind_with`]: Self::bind_with
pub struct KeyGenerator<T>
where
    T: TimeSource,
{
    config: GeneratorConfig,
    time: T,
    slot: RwLock<WorkerSlot<LockSnowflakeGenerator<T>>>,
}

impl KeyGenerator<SystemClock> {
    /// Creates an unbound generator reading the system clock relative to the
    /// configured epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid or the
    /// epoch lies in the future.
    pub fn from_config(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let time = config.system_clock()?;
        Self::new(config, time)
    }
}

impl<T> KeyGenerator<T>
where
    T: TimeSource + Clone,
{
    /// Creates an unbound generator reading `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid.
    pub fn new(config: GeneratorConfig, time: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            time,
            slot: RwLock::new(WorkerSlot::Unbound),
        })
    }

    /// Binds the worker ID.
    ///
    /// Rebinding to a different ID is allowed. The previous clock state
    /// carries over with its sequence used up, so every ID issued after the
    /// rebind is greater than every ID issued before it. Rebinding to the
    /// current ID does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerId`] if `worker_id` does not fit the
    /// layout; the previous binding stays in place.
    pub fn bind(&self, worker_id: i64) -> Result<u64> {
        let rules = Rules::new(&self.config, worker_id)?;
        let machine_id = rules.machine_id;

        let mut slot = mutex::write(&self.slot)?;
        let state = match &*slot {
            WorkerSlot::Bound(current) if current.machine_id() == machine_id => {
                return Ok(machine_id);
            }
            WorkerSlot::Bound(current) => {
                #[cfg(feature = "tracing")]
                tracing::info!(machine_id, previous = current.machine_id(), "worker id rebound");
                current
                    .snapshot()?
                    .exhausted(self.config.layout.max_sequence())
            }
            WorkerSlot::Unbound => {
                #[cfg(feature = "tracing")]
                tracing::info!(machine_id, "worker id bound");
                GeneratorState::FRESH
            }
        };

        *slot = WorkerSlot::Bound(LockSnowflakeGenerator::resume(
            rules,
            state,
            self.time.clone(),
        ));
        Ok(machine_id)
    }

    /// Asks `provider` for a worker ID and binds it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerIdProvider`] if the provider fails, otherwise
    /// the errors of [`Self::bind`].
    pub fn bind_with<P>(&self, provider: &P) -> Result<u64>
    where
        P: WorkerIdProvider + ?Sized,
    {
        let worker_id = provider
            .worker_id()
            .map_err(|e| Error::WorkerIdProvider(e.to_string()))?;
        self.bind(worker_id)
    }
}

impl<T> KeyGenerator<T>
where
    T: TimeSource,
{
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub const fn layout(&self) -> Layout {
        self.config.layout
    }

    /// The bound worker ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnboundWorkerId`] before the first successful bind.
    pub fn worker_id(&self) -> Result<u64> {
        let slot = mutex::read(&self.slot)?;
        Ok(slot.bound()?.machine_id())
    }

    /// Generates one numeric ID, blocking while the sequence is exhausted or
    /// the clock is behind within the tolerated drift.
    ///
    /// # Errors
    ///
    /// - [`Error::UnboundWorkerId`] before a worker ID is bound
    /// - [`Error::ClockRolledBack`] if the clock is further behind than the
    ///   rollback policy tolerates
    /// - [`Error::EncodingRange`] once the epoch is exhausted
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn generate(&self) -> Result<SnowflakeId> {
        let slot = mutex::read(&self.slot)?;
        slot.bound()?.next_id()
    }

    /// Generates `count` numeric IDs in issuance order.
    ///
    /// The whole batch comes from one binding. A batch of `0` returns an empty
    /// vector, but still requires a bound worker ID.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`]. IDs generated before the failing one are
    /// discarded.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn generate_batch(&self, count: usize) -> Result<Vec<SnowflakeId>> {
        let slot = mutex::read(&self.slot)?;
        let generator = slot.bound()?;
        (0..count).map(|_| generator.next_id()).collect()
    }

    /// Generates one ID in its fixed-width radix-62 form.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`].
    pub fn generate_as_string(&self) -> Result<String> {
        self.layout().encode_str(self.generate()?)
    }

    /// Generates `count` IDs in their fixed-width radix-62 form.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`].
    pub fn generate_batch_as_string(&self, count: usize) -> Result<Vec<String>> {
        let layout = self.layout();
        self.generate_batch(count)?
            .into_iter()
            .map(|id| layout.encode_str(id))
            .collect()
    }

    /// Generates one key in the configured representation (see
    /// [`GeneratorConfig::as_string`]).
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`].
    pub fn generate_key(&self) -> Result<Identifier> {
        if self.config.as_string {
            self.generate_as_string().map(Identifier::Text)
        } else {
            self.generate().map(Identifier::Numeric)
        }
    }

    /// Generates `count` keys in the configured representation.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`].
    pub fn generate_keys(&self, count: usize) -> Result<Vec<Identifier>> {
        if self.config.as_string {
            Ok(self
                .generate_batch_as_string(count)?
                .into_iter()
                .map(Identifier::Text)
                .collect())
        } else {
            Ok(self
                .generate_batch(count)?
                .into_iter()
                .map(Identifier::Numeric)
                .collect())
        }
    }

    /// Decodes a numeric ID produced with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodingRange`] if `id` has bits set above the layout.
    pub fn decode(&self, id: SnowflakeId) -> Result<IdState> {
        self.config.parse(id)
    }

    /// Decodes a radix-62 key produced with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodingFormat`] if `key` is malformed.
    pub fn decode_str(&self, key: &str) -> Result<IdState> {
        self.config.parse(self.layout().decode_str(key)?)
    }

    /// Decodes a key of either representation.
    ///
    /// # Errors
    ///
    /// Same as [`Self::decode`] and [`Self::decode_str`].
    pub fn decode_key(&self, key: &Identifier) -> Result<IdState> {
        match key {
            Identifier::Numeric(id) => self.decode(*id),
            Identifier::Text(s) => self.decode_str(s),
        }
    }
}
