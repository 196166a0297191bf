//! Random number generators.

use keyward_ipc::{Arg, Error, Proxy, Region, Result, TaskId, proxy, tasks};

use crate::context::ContextTasks;

tasks! {
    /// Tasks served by a random number generator.
    pub enum RngTask: 0x0008 {
        AlgorithmId = 1,
        IsInitialized = 2,
        Seed = 3,
        AddEntropy = 4,
        Generate = 5,
    }
}

proxy! {
    /// A random number generator context.
    pub struct RngCtxProxy;
}

impl RngCtxProxy {
    /// Reseeds the generator.
    pub fn seed(&self, seed: &[u8]) -> Result<()> {
        self.base()
            .call_fallible(RngTask::Seed, &mut [Arg::value(seed)])
    }

    /// Mixes `entropy` into the generator's state.
    pub fn add_entropy(&self, entropy: &[u8]) -> Result<()> {
        self.base()
            .call_fallible(RngTask::AddEntropy, &mut [Arg::value(entropy)])
    }

    /// Fills `out` with random bytes.
    pub fn fill(&self, out: &mut [u8]) -> Result<()> {
        let len = out.len();
        let mut region = Region::new(out);
        self.base()
            .call_fallible::<()>(RngTask::Generate, &mut [Arg::out(&mut region)])?;
        if region.written() != len {
            return Err(Error::InvalidArgument(
                "generator returned fewer bytes than requested",
            ));
        }
        Ok(())
    }

    /// Returns `count` random bytes.
    pub fn generate(&self, count: usize) -> Result<Vec<u8>> {
        let mut out = vec![0; count];
        self.fill(&mut out)?;
        Ok(out)
    }
}

impl ContextTasks for RngCtxProxy {
    const ALGORITHM_ID: TaskId = RngTask::AlgorithmId.id();
    const IS_INITIALIZED: TaskId = RngTask::IsInitialized.id();
}
