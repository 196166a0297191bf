//! Key storage and trusted containers.

use keyward_ipc::{Arg, Proxy, Result, proxy, tasks};
use tracing::debug;

use crate::keys::{DomainParametersProxy, PrivateKeyProxy, SymmetricKeyProxy};

tasks! {
    /// Tasks served by the key storage provider.
    pub enum KeyStorageTask: 0x0011 {
        OpenAsUser = 1,
        OpenAsOwner = 2,
        BeginTransaction = 3,
        CommitTransaction = 4,
        RollbackTransaction = 5,
        SaveKey = 6,
    }
}

proxy! {
    /// The server's persistent key storage.
    pub struct KeyStorageProviderProxy;
}

impl KeyStorageProviderProxy {
    /// Opens the key slot named `slot` for reading.
    pub fn open_as_user(&self, slot: &str) -> Result<TrustedContainerProxy> {
        self.base()
            .create_fallible(KeyStorageTask::OpenAsUser, &mut [Arg::value(slot)])
    }

    /// Opens the key slot named `slot` for updating.
    pub fn open_as_owner(&self, slot: &str) -> Result<TrustedContainerProxy> {
        self.base()
            .create_fallible(KeyStorageTask::OpenAsOwner, &mut [Arg::value(slot)])
    }

    /// Starts a transaction over `slots` and returns its id.
    pub fn begin_transaction(&self, slots: &[&str]) -> Result<u64> {
        let joined = slots.join("\n");
        self.base()
            .call_fallible(KeyStorageTask::BeginTransaction, &mut [Arg::value(&joined)])
    }

    /// Commits transaction `id`.
    pub fn commit_transaction(&self, id: u64) -> Result<()> {
        self.base()
            .call_fallible(KeyStorageTask::CommitTransaction, &mut [Arg::value(&id)])
    }

    /// Abandons transaction `id`.
    pub fn rollback_transaction(&self, id: u64) -> Result<()> {
        self.base()
            .call_fallible(KeyStorageTask::RollbackTransaction, &mut [Arg::value(&id)])
    }

    /// Moves `key` into `container`.
    ///
    /// On success the container owns the key and dropping the
    /// proxy no longer destroys it. On failure the key is
    /// dropped as usual.
    pub fn save_key(&self, container: &TrustedContainerProxy, key: PrivateKeyProxy) -> Result<()> {
        self.base().call_fallible::<()>(
            KeyStorageTask::SaveKey,
            &mut [Arg::object(container), Arg::object(&key)],
        )?;
        let id = key.into_base().transfer_ownership();
        debug!(key = %id, container = %container.object_id(), "key saved");
        Ok(())
    }
}

tasks! {
    /// Tasks served by a trusted container.
    pub enum TrustedContainerTask: 0x0012 {
        ObjectType = 1,
        Capacity = 2,
        ContentSize = 3,
        IsVolatile = 4,
        ImportObject = 5,
        LoadPrivateKey = 6,
        LoadSymmetricKey = 7,
        LoadDomainParameters = 8,
    }
}

proxy! {
    /// An opened key slot.
    pub struct TrustedContainerProxy;
}

impl TrustedContainerProxy {
    /// Returns the kind of object stored in the container, zero
    /// if it is empty.
    pub fn object_type(&self) -> Result<u32> {
        self.base()
            .call_returning(TrustedContainerTask::ObjectType, &mut [])
    }

    /// Returns the container's capacity in bytes.
    pub fn capacity(&self) -> Result<usize> {
        self.base()
            .call_returning(TrustedContainerTask::Capacity, &mut [])
    }

    /// Returns the size of the stored object in bytes.
    pub fn content_size(&self) -> Result<usize> {
        self.base()
            .call_returning(TrustedContainerTask::ContentSize, &mut [])
    }

    /// Reports whether the container is lost when the session
    /// ends.
    pub fn is_volatile(&self) -> Result<bool> {
        self.base()
            .call_returning(TrustedContainerTask::IsVolatile, &mut [])
    }

    /// Stores an encoded object, which may be of any size.
    pub fn import_object(&self, data: &[u8]) -> Result<()> {
        self.base()
            .call_chunked(TrustedContainerTask::ImportObject, data, &mut [])
    }

    /// Loads the stored private key.
    pub fn load_private_key(&self) -> Result<PrivateKeyProxy> {
        self.base()
            .create_fallible(TrustedContainerTask::LoadPrivateKey, &mut [])
    }

    /// Loads the stored symmetric key.
    pub fn load_symmetric_key(&self) -> Result<SymmetricKeyProxy> {
        self.base()
            .create_fallible(TrustedContainerTask::LoadSymmetricKey, &mut [])
    }

    /// Loads the stored domain parameters.
    pub fn load_domain_parameters(&self) -> Result<DomainParametersProxy> {
        self.base()
            .create_fallible(TrustedContainerTask::LoadDomainParameters, &mut [])
    }
}
