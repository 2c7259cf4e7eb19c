//! Persistent config record with power-loss safe A/B slots.
//!
//! Implements [`ConfigPort`] on top of any [`StoragePort`].  Records are
//! written alternately into two keys so that the previous record is never
//! overwritten in place:
//!
//! ```text
//!  slot blob = [ seq: u32 LE ][ sha256(json): 32 B ][ json ]
//!
//!  save #n   ──▶ cfg_a   (seq = n)
//!  save #n+1 ──▶ cfg_b   (seq = n+1)
//!  save #n+2 ──▶ cfg_a   (seq = n+2)
//! ```
//!
//! `load()` takes the slot with the highest sequence whose digest
//! verifies.  A torn write leaves a slot that fails its digest, so the
//! older slot wins and the last good record stays authoritative.
//!
//! The JSON body is an object with the five named fields.  Fields that
//! are missing or out of range are replaced by their defaults one at a
//! time, and the repaired record is written back.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{FilterConfig, RawFilterConfig};
use crate::error::Error;

/// Storage namespace for config records.
pub const NAMESPACE: &str = "rofilter";
/// The two alternating slot keys.
pub const SLOT_KEYS: [&str; 2] = ["cfg_a", "cfg_b"];

const SEQ_LEN: usize = 4;
const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = SEQ_LEN + DIGEST_LEN;
/// Largest slot blob accepted on read.
pub const MAX_RECORD: usize = 256;

/// Serialise `config` into a slot blob carrying `seq`.
pub fn encode_slot(seq: u32, config: &FilterConfig) -> Result<Vec<u8>, ConfigError> {
    let json = serde_json::to_vec(config).map_err(|_| ConfigError::Io)?;
    let mut blob = Vec::with_capacity(HEADER_LEN + json.len());
    blob.extend_from_slice(&seq.to_le_bytes());
    blob.extend_from_slice(&hmac_sha256::Hash::hash(&json));
    blob.extend_from_slice(&json);
    if blob.len() > MAX_RECORD {
        return Err(ConfigError::Io);
    }
    Ok(blob)
}

/// Parse a slot blob.  Returns `None` for anything truncated, with a bad
/// digest, or whose body does not decode as a record.
pub fn decode_slot(blob: &[u8]) -> Option<(u32, RawFilterConfig)> {
    if blob.len() <= HEADER_LEN || blob.len() > MAX_RECORD {
        return None;
    }
    let (seq, rest) = blob.split_at(SEQ_LEN);
    let (digest, json) = rest.split_at(DIGEST_LEN);
    if hmac_sha256::Hash::hash(json) != digest {
        return None;
    }
    let seq = u32::from_le_bytes(seq.try_into().ok()?);
    let raw = serde_json::from_slice::<RawFilterConfig>(json).ok()?;
    Some((seq, raw))
}

/// [`ConfigPort`] over a [`StoragePort`].
pub struct ConfigStore<S> {
    storage: S,
    /// Slot index holding the newest valid record, if any.
    active: Option<usize>,
    seq: u32,
}

impl<S: StoragePort> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            active: None,
            seq: 0,
        }
    }

    /// Sequence number of the newest record this store has seen or written.
    pub fn generation(&self) -> u32 {
        self.seq
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    fn write_record(&mut self, config: &FilterConfig) -> Result<(), ConfigError> {
        let slot = self.active.map_or(0, |a| 1 - a);
        let seq = self.seq.wrapping_add(1);
        let blob = encode_slot(seq, config)?;

        self.storage
            .write(NAMESPACE, SLOT_KEYS[slot], &blob)
            .map_err(|e| {
                warn!("ConfigStore: write {} failed: {}", SLOT_KEYS[slot], e);
                ConfigError::Io
            })?;

        self.active = Some(slot);
        self.seq = seq;
        info!("ConfigStore: saved seq={} to {}", seq, SLOT_KEYS[slot]);
        Ok(())
    }
}

impl<S: StoragePort> ConfigPort for ConfigStore<S> {
    fn load(&mut self) -> Result<FilterConfig, ConfigError> {
        let mut best: Option<(usize, u32, RawFilterConfig)> = None;
        let mut unreachable = false;

        for (slot, key) in SLOT_KEYS.iter().enumerate() {
            let mut buf = [0u8; MAX_RECORD];
            let blob = match self.storage.read(NAMESPACE, key, &mut buf) {
                Ok(len) => &buf[..len],
                Err(StorageError::NotFound) => continue,
                Err(StorageError::BufferTooSmall) => {
                    warn!("ConfigStore: {} oversized, ignoring", key);
                    continue;
                }
                Err(e) => {
                    warn!("ConfigStore: read {} failed: {}", key, e);
                    unreachable = true;
                    continue;
                }
            };
            match decode_slot(blob) {
                Some((seq, raw)) => {
                    if best.as_ref().is_none_or(|(_, s, _)| seq > *s) {
                        best = Some((slot, seq, raw));
                    }
                }
                None => warn!("ConfigStore: {} failed integrity check, ignoring", key),
            }
        }

        let Some((slot, seq, raw)) = best else {
            if unreachable {
                return Err(ConfigError::Io);
            }
            info!("ConfigStore: no stored config, writing defaults");
            let config = FilterConfig::default();
            self.write_record(&config)?;
            return Ok(config);
        };

        self.active = Some(slot);
        self.seq = seq;
        let (config, repaired) = FilterConfig::sanitize(&raw);
        info!(
            "ConfigStore: loaded seq={} from {} ({} field(s) repaired)",
            seq, SLOT_KEYS[slot], repaired
        );
        if repaired > 0 {
            if let Err(e) = self.write_record(&config) {
                warn!("ConfigStore: could not persist repaired config: {}", e);
            }
        }
        Ok(config)
    }

    fn save(&mut self, config: &FilterConfig) -> Result<(), ConfigError> {
        config.validate().map_err(|e| match e {
            Error::InvalidConfigValue(field) => ConfigError::ValidationFailed(field),
            _ => ConfigError::Io,
        })?;
        self.write_record(config)
    }
}
