//! Hash function contexts.

use keyward_ipc::{TaskId, proxy, tasks};

use crate::context::{ContextTasks, DigestTasks, StreamTasks};

tasks! {
    /// Tasks served by a hash function context.
    pub enum HashTask: 0x0002 {
        AlgorithmId = 1,
        IsInitialized = 2,
        Start = 3,
        IsStarted = 4,
        Update = 5,
        UpdateByte = 6,
        Finish = 7,
        GetDigest = 8,
        DigestSize = 9,
    }
}

proxy! {
    /// A hash function context.
    ///
    /// Use it through [`BufferedDigest`][crate::BufferedDigest].
    pub struct HashCtxProxy;
}

impl ContextTasks for HashCtxProxy {
    const ALGORITHM_ID: TaskId = HashTask::AlgorithmId.id();
    const IS_INITIALIZED: TaskId = HashTask::IsInitialized.id();
}

impl StreamTasks for HashCtxProxy {
    const START: TaskId = HashTask::Start.id();
    const IS_STARTED: TaskId = HashTask::IsStarted.id();
}

impl DigestTasks for HashCtxProxy {
    const UPDATE: TaskId = HashTask::Update.id();
    const UPDATE_BYTE: TaskId = HashTask::UpdateByte.id();
    const FINISH: TaskId = HashTask::Finish.id();
    const GET_DIGEST: TaskId = HashTask::GetDigest.id();
    const DIGEST_SIZE: TaskId = HashTask::DigestSize.id();
}
