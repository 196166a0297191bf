//! Stream cipher contexts.

use keyward_ipc::{Arg, Proxy, Region, Result, TaskId, proxy, tasks};

use crate::context::{ContextTasks, KeyedTasks, StreamTasks};

tasks! {
    /// Tasks served by a stream cipher context.
    pub enum StreamCipherTask: 0x0004 {
        AlgorithmId = 1,
        IsInitialized = 2,
        Start = 3,
        IsStarted = 4,
        SetKey = 5,
        Reset = 6,
        SetDirection = 7,
        BlockSize = 8,
        IsBytesStreaming = 9,
        CountBytesInCache = 10,
        ProcessBlocks = 11,
        ProcessBytes = 12,
        ProcessBytesInPlace = 13,
        FinishBytes = 14,
    }
}

/// The transformation a cipher context performs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Encrypt.
    Encrypt,
    /// Decrypt.
    Decrypt,
}

proxy! {
    /// A stream cipher context.
    pub struct StreamCipherCtxProxy;
}

impl StreamCipherCtxProxy {
    /// Selects encryption or decryption.
    pub fn set_direction(&self, dir: Direction) -> Result<()> {
        let encrypt = dir == Direction::Encrypt;
        self.base()
            .call_fallible(StreamCipherTask::SetDirection, &mut [Arg::value(&encrypt)])
    }

    /// Returns the block size in bytes.
    pub fn block_size(&self) -> Result<usize> {
        self.base()
            .call_returning(StreamCipherTask::BlockSize, &mut [])
    }

    /// Reports whether input of any length can be processed.
    pub fn is_bytes_streaming(&self) -> Result<bool> {
        self.base()
            .call_returning(StreamCipherTask::IsBytesStreaming, &mut [])
    }

    /// Returns the number of input bytes held back until a
    /// block is complete.
    pub fn count_bytes_in_cache(&self) -> Result<usize> {
        self.base()
            .call_returning(StreamCipherTask::CountBytesInCache, &mut [])
    }

    /// Processes whole blocks of `input` into `out` and returns
    /// the number of bytes written.
    pub fn process_blocks(&self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        self.process(StreamCipherTask::ProcessBlocks, input, out)
    }

    /// Processes any number of bytes of `input` into `out` and
    /// returns the number of bytes written.
    pub fn process_bytes(&self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        self.process(StreamCipherTask::ProcessBytes, input, out)
    }

    /// Processes `buf` in place and returns the number of bytes
    /// written back.
    pub fn process_bytes_in_place(&self, buf: &mut [u8]) -> Result<usize> {
        let mut region = Region::new(buf);
        self.base().call_fallible(
            StreamCipherTask::ProcessBytesInPlace,
            &mut [Arg::out(&mut region)],
        )
    }

    /// Processes the last bytes of the stream, flushing the
    /// cache, and returns the number of bytes written.
    pub fn finish_bytes(&self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        self.process(StreamCipherTask::FinishBytes, input, out)
    }

    fn process(&self, task: StreamCipherTask, input: &[u8], out: &mut [u8]) -> Result<usize> {
        let mut region = Region::new(out);
        self.base()
            .call_fallible(task, &mut [Arg::value(input), Arg::out(&mut region)])
    }
}

impl ContextTasks for StreamCipherCtxProxy {
    const ALGORITHM_ID: TaskId = StreamCipherTask::AlgorithmId.id();
    const IS_INITIALIZED: TaskId = StreamCipherTask::IsInitialized.id();
}

impl StreamTasks for StreamCipherCtxProxy {
    const START: TaskId = StreamCipherTask::Start.id();
    const IS_STARTED: TaskId = StreamCipherTask::IsStarted.id();
}

impl KeyedTasks for StreamCipherCtxProxy {
    const SET_KEY: TaskId = StreamCipherTask::SetKey.id();
    const RESET: TaskId = StreamCipherTask::Reset.id();
}
