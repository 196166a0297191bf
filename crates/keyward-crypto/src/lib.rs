//! Client-side proxies for the Keyward cryptography service.
//!
//! Each type here stands in for an object living in the crypto
//! server. Start from a [`CryptoProviderProxy`], which creates
//! contexts and keys; every method is a single remote call made
//! through [`keyward_ipc`].
//!
//! ```no_run
//! # use keyward_crypto::{BufferedDigest, CryptoProviderProxy, StreamStarting};
//! # fn run(provider: &CryptoProviderProxy) -> keyward_ipc::Result<()> {
//! let sha256 = provider.alg_id_by_name("SHA-256")?;
//! let hash = provider.create_hash_ctx(sha256)?;
//! hash.start(&[])?;
//! hash.update(b"abc")?;
//! let digest = hash.finish()?;
//! # let _ = digest;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod agreement;
mod cipher;
mod context;
mod hash;
mod kdf;
mod keys;
mod keystore;
mod mac;
mod provider;
mod rng;
mod signer;
pub mod x509;

pub use crate::{
    agreement::{KeyAgreementPrivateCtxProxy, KeyAgreementTask},
    cipher::{Direction, StreamCipherCtxProxy, StreamCipherTask},
    context::{
        ALG_ID_UNDEFINED, AlgId, BufferedDigest, ContextTasks, CryptoContext, DigestTasks,
        KeyedContext, KeyedTasks, StreamStarting, StreamTasks,
    },
    hash::{HashCtxProxy, HashTask},
    kdf::{KdfCtxProxy, KdfTask},
    keys::{
        DomainParametersProxy, DomainParametersTask, KeyAttributes, PrivateKeyProxy,
        PrivateKeyTask, SymmetricKeyProxy, SymmetricKeyTask,
    },
    keystore::{
        KeyStorageProviderProxy, KeyStorageTask, TrustedContainerProxy, TrustedContainerTask,
    },
    mac::{MacCtxProxy, MacTask},
    provider::{CryptoProviderProxy, ProviderTask},
    rng::{RngCtxProxy, RngTask},
    signer::{SignatureProxy, SignatureTask, SignerPrivateCtxProxy, SignerTask},
};
