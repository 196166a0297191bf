//! Message authentication code contexts.

use keyward_ipc::{Arg, Proxy, Result, TaskId, proxy, tasks};

use crate::{
    context::{ContextTasks, DigestTasks, KeyedTasks, StreamTasks},
    signer::SignatureProxy,
};

tasks! {
    /// Tasks served by a MAC context.
    pub enum MacTask: 0x0003 {
        AlgorithmId = 1,
        IsInitialized = 2,
        Start = 3,
        IsStarted = 4,
        Update = 5,
        UpdateByte = 6,
        Finish = 7,
        GetDigest = 8,
        DigestSize = 9,
        SetKey = 10,
        Reset = 11,
        FinishSignature = 12,
        Check = 13,
    }
}

proxy! {
    /// A message authentication code context.
    ///
    /// It is both a [`KeyedContext`][crate::KeyedContext] and a
    /// [`BufferedDigest`][crate::BufferedDigest].
    pub struct MacCtxProxy;
}

impl MacCtxProxy {
    /// Completes the stream and returns the tag as a signature
    /// object.
    pub fn finish_signature(&self) -> Result<SignatureProxy> {
        self.base()
            .create_fallible(MacTask::FinishSignature, &mut [])
    }

    /// Reports whether the computed tag equals `expected`.
    pub fn check(&self, expected: &SignatureProxy) -> Result<bool> {
        self.base()
            .call_fallible(MacTask::Check, &mut [Arg::object(expected)])
    }
}

impl ContextTasks for MacCtxProxy {
    const ALGORITHM_ID: TaskId = MacTask::AlgorithmId.id();
    const IS_INITIALIZED: TaskId = MacTask::IsInitialized.id();
}

impl StreamTasks for MacCtxProxy {
    const START: TaskId = MacTask::Start.id();
    const IS_STARTED: TaskId = MacTask::IsStarted.id();
}

impl DigestTasks for MacCtxProxy {
    const UPDATE: TaskId = MacTask::Update.id();
    const UPDATE_BYTE: TaskId = MacTask::UpdateByte.id();
    const FINISH: TaskId = MacTask::Finish.id();
    const GET_DIGEST: TaskId = MacTask::GetDigest.id();
    const DIGEST_SIZE: TaskId = MacTask::DigestSize.id();
}

impl KeyedTasks for MacCtxProxy {
    const SET_KEY: TaskId = MacTask::SetKey.id();
    const RESET: TaskId = MacTask::Reset.id();
}
