//! The process image: a concurrent, sparse store of the four Modbus areas.
//!
//! Each area sits behind its own reader/writer lock, so readers of one area
//! never contend with writers of another. All mutation flows through a write
//! transaction that stages its changes and commits them only when the
//! transaction body returns `Ok`, which keeps a failing body from leaving a
//! partially-applied span behind. Committed cells are reported to an optional
//! modification listener through an unbounded channel, so a slow consumer
//! never stalls a writer that is holding an area lock.

use tokio::sync::mpsc::UnboundedSender;

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A committed modification to one cell of the process image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modification {
    /// a coil changed
    Coil {
        /// offset within the coil area
        offset: u16,
        /// committed value
        value: bool,
    },
    /// a discrete input changed
    DiscreteInput {
        /// offset within the discrete input area
        offset: u16,
        /// committed value
        value: bool,
    },
    /// a holding register changed
    HoldingRegister {
        /// offset within the holding register area
        offset: u16,
        /// committed register contents, wire order
        value: [u8; 2],
    },
    /// an input register changed
    InputRegister {
        /// offset within the input register area
        offset: u16,
        /// committed register contents, wire order
        value: [u8; 2],
    },
}

/// Read-only view of a bit area; absent offsets read as `false`
pub struct BitView<'a> {
    map: &'a BTreeMap<u16, bool>,
}

impl BitView<'_> {
    /// value at `offset`, defaulting to `false`
    pub fn get(&self, offset: u16) -> bool {
        self.map.get(&offset).copied().unwrap_or(false)
    }
}

/// Read-only view of a register area; absent offsets read as zero
pub struct RegisterView<'a> {
    map: &'a BTreeMap<u16, [u8; 2]>,
}

impl RegisterView<'_> {
    /// register contents at `offset`, defaulting to `[0, 0]`
    pub fn get(&self, offset: u16) -> [u8; 2] {
        self.map.get(&offset).copied().unwrap_or([0, 0])
    }
}

/// Write transaction over a bit area
///
/// Writes are staged and only committed if the transaction body returns `Ok`.
/// Reads observe the staged state, which is what makes a read-modify-write
/// sequence atomic within one transaction.
pub struct BitTransaction<'a> {
    map: &'a BTreeMap<u16, bool>,
    staged: BTreeMap<u16, bool>,
}

impl BitTransaction<'_> {
    /// value at `offset`, observing staged writes, defaulting to `false`
    pub fn get(&self, offset: u16) -> bool {
        match self.staged.get(&offset) {
            Some(value) => *value,
            None => self.map.get(&offset).copied().unwrap_or(false),
        }
    }

    /// stage a write to `offset`
    pub fn set(&mut self, offset: u16, value: bool) {
        self.staged.insert(offset, value);
    }
}

/// Write transaction over a register area
pub struct RegisterTransaction<'a> {
    map: &'a BTreeMap<u16, [u8; 2]>,
    staged: BTreeMap<u16, [u8; 2]>,
}

impl RegisterTransaction<'_> {
    /// register contents at `offset`, observing staged writes
    pub fn get(&self, offset: u16) -> [u8; 2] {
        match self.staged.get(&offset) {
            Some(value) => *value,
            None => self.map.get(&offset).copied().unwrap_or([0, 0]),
        }
    }

    /// stage a write to `offset`
    pub fn set(&mut self, offset: u16, value: [u8; 2]) {
        self.staged.insert(offset, value);
    }
}

/// The shared, lock-protected store of coil and register state for one device
///
/// Created once per device and shared by the translation layer, the field-side
/// services and the persistence listener. Storage is sparse with a uniform
/// always-store policy: writing a default value keeps an explicit entry, and
/// absent entries read as `false` / zero.
pub struct ProcessImage {
    coils: RwLock<BTreeMap<u16, bool>>,
    discrete_inputs: RwLock<BTreeMap<u16, bool>>,
    holding_registers: RwLock<BTreeMap<u16, [u8; 2]>>,
    input_registers: RwLock<BTreeMap<u16, [u8; 2]>>,
    listener: RwLock<Option<UnboundedSender<Modification>>>,
}

impl Default for ProcessImage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessImage {
    /// Create an empty process image
    pub fn new() -> Self {
        Self {
            coils: RwLock::new(BTreeMap::new()),
            discrete_inputs: RwLock::new(BTreeMap::new()),
            holding_registers: RwLock::new(BTreeMap::new()),
            input_registers: RwLock::new(BTreeMap::new()),
            listener: RwLock::new(None),
        }
    }

    /// Install the modification listener
    ///
    /// One [Modification] per committed cell is sent at the end of each write
    /// transaction, while the writer still holds the area lock, so the
    /// listener observes a fully consistent post-write state. Sends never
    /// block; the receiving side drains the channel at its own pace.
    pub fn set_modification_listener(&self, listener: UnboundedSender<Modification>) {
        *write_lock(&self.listener) = Some(listener);
    }

    /// Run a read transaction against the coil area
    pub fn read_coils<R>(&self, f: impl FnOnce(&BitView) -> R) -> R {
        let guard = read_lock(&self.coils);
        f(&BitView { map: &guard })
    }

    /// Run a read transaction against the discrete input area
    pub fn read_discrete_inputs<R>(&self, f: impl FnOnce(&BitView) -> R) -> R {
        let guard = read_lock(&self.discrete_inputs);
        f(&BitView { map: &guard })
    }

    /// Run a read transaction against the holding register area
    pub fn read_holding_registers<R>(&self, f: impl FnOnce(&RegisterView) -> R) -> R {
        let guard = read_lock(&self.holding_registers);
        f(&RegisterView { map: &guard })
    }

    /// Run a read transaction against the input register area
    pub fn read_input_registers<R>(&self, f: impl FnOnce(&RegisterView) -> R) -> R {
        let guard = read_lock(&self.input_registers);
        f(&RegisterView { map: &guard })
    }

    /// Run a write transaction against the coil area
    ///
    /// The error type is the caller's own; the supervisory and field sides
    /// run transactions with different error vocabularies.
    pub fn write_coils<R, E>(
        &self,
        f: impl FnOnce(&mut BitTransaction) -> Result<R, E>,
    ) -> Result<R, E> {
        self.write_bits(&self.coils, f, |offset, value| Modification::Coil {
            offset,
            value,
        })
    }

    /// Run a write transaction against the discrete input area
    pub fn write_discrete_inputs<R, E>(
        &self,
        f: impl FnOnce(&mut BitTransaction) -> Result<R, E>,
    ) -> Result<R, E> {
        self.write_bits(&self.discrete_inputs, f, |offset, value| {
            Modification::DiscreteInput { offset, value }
        })
    }

    /// Run a write transaction against the holding register area
    pub fn write_holding_registers<R, E>(
        &self,
        f: impl FnOnce(&mut RegisterTransaction) -> Result<R, E>,
    ) -> Result<R, E> {
        self.write_registers(&self.holding_registers, f, |offset, value| {
            Modification::HoldingRegister { offset, value }
        })
    }

    /// Run a write transaction against the input register area
    pub fn write_input_registers<R, E>(
        &self,
        f: impl FnOnce(&mut RegisterTransaction) -> Result<R, E>,
    ) -> Result<R, E> {
        self.write_registers(&self.input_registers, f, |offset, value| {
            Modification::InputRegister { offset, value }
        })
    }

    fn write_bits<R, E>(
        &self,
        area: &RwLock<BTreeMap<u16, bool>>,
        f: impl FnOnce(&mut BitTransaction) -> Result<R, E>,
        modification: fn(u16, bool) -> Modification,
    ) -> Result<R, E> {
        let mut guard = write_lock(area);

        let staged = {
            let mut tx = BitTransaction {
                map: &guard,
                staged: BTreeMap::new(),
            };
            let result = f(&mut tx)?;
            (result, tx.staged)
        };

        let (result, staged) = staged;
        for (offset, value) in &staged {
            guard.insert(*offset, *value);
        }
        self.notify(staged.into_iter().map(|(o, v)| modification(o, v)));

        Ok(result)
    }

    fn write_registers<R, E>(
        &self,
        area: &RwLock<BTreeMap<u16, [u8; 2]>>,
        f: impl FnOnce(&mut RegisterTransaction) -> Result<R, E>,
        modification: fn(u16, [u8; 2]) -> Modification,
    ) -> Result<R, E> {
        let mut guard = write_lock(area);

        let staged = {
            let mut tx = RegisterTransaction {
                map: &guard,
                staged: BTreeMap::new(),
            };
            let result = f(&mut tx)?;
            (result, tx.staged)
        };

        let (result, staged) = staged;
        for (offset, value) in &staged {
            guard.insert(*offset, *value);
        }
        self.notify(staged.into_iter().map(|(o, v)| modification(o, v)));

        Ok(result)
    }

    fn notify(&self, modifications: impl Iterator<Item = Modification>) {
        let listener = read_lock(&self.listener);
        if let Some(tx) = listener.as_ref() {
            for modification in modifications {
                tracing::trace!("modification: {:?}", modification);
                // a dropped receiver just means nobody is persisting anymore
                let _ = tx.send(modification);
            }
        }
    }
}

// Poisoning is recoverable here: write transactions stage into a scratch
// buffer, so a panicking body never leaves an area map half-mutated.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
