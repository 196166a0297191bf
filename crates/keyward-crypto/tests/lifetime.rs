#![allow(clippy::arithmetic_side_effects, clippy::panic, clippy::unwrap_used)]

mod common;

use anyhow::Result;
use keyward_crypto::{
    KeyAttributes, KeyStorageTask, PrivateKeyTask, ProviderTask, SignatureTask, SignerTask,
    TrustedContainerTask,
};
use keyward_ipc::{Config, Error, ErrorCode, Proxy, Slot};
use test_log::test;

use crate::common::{created, fail, is, new_id, not_created, ok, serve, serve_with, tag};

#[test]
fn test_sign_not_created() -> Result<()> {
    let server = serve(|task, slots| match task {
        t if is(t, ProviderTask::CreateSignerPrivateCtx) => created(),
        t if is(t, SignerTask::Sign) => match slots.first() {
            Some(Slot::Bytes(v)) if v.is_empty() => fail(ErrorCode::InvalidInputSize),
            _ => not_created(),
        },
        _ => ok(Slot::Unit),
    });
    let signer = server.provider.create_signer_private_ctx(2)?;
    let baseline = server.session.live_objects();

    let err = signer.sign(b"value", b"").unwrap_err();
    assert!(matches!(err, Error::NotCreated));
    let err = signer.sign(b"", b"").unwrap_err();
    assert!(matches!(err, Error::Remote(ErrorCode::InvalidInputSize)));

    assert_eq!(server.session.live_objects(), baseline);
    assert!(server.journal.destroyed().is_empty());

    let speculative = new_id(&server.requests_for(SignerTask::Sign)[0]);
    let id = signer.object_id();
    drop(signer);
    assert_eq!(server.journal.destroyed(), [id]);
    assert_ne!(speculative, id);
    Ok(())
}

#[test]
fn test_signature_lifecycle() -> Result<()> {
    let server = serve(|task, _| match task {
        t if is(t, ProviderTask::CreateSignerPrivateCtx)
            || is(t, ProviderTask::GeneratePrivateKey)
            || is(t, SignerTask::Sign) =>
        {
            created()
        }
        t if is(t, SignatureTask::Value) => ok(Slot::Bytes(vec![1, 2, 3])),
        t if is(t, SignatureTask::RequiredHashSize) => Slot::U64(32),
        _ => ok(Slot::Unit),
    });
    let key = server
        .provider
        .generate_private_key(2, KeyAttributes::default())?;
    let signer = server.provider.create_signer_private_ctx(2)?;
    signer.set_key(&key)?;

    let sig = signer.sign(b"value", b"ctx")?;
    assert_eq!(sig.value()?, [1, 2, 3]);
    assert_eq!(sig.required_hash_size()?, 32);

    let sig_id = sig.object_id();
    drop(sig);
    assert_eq!(server.journal.destroyed(), [sig_id]);
    Ok(())
}

#[test]
fn test_domain_parameters_absent() -> Result<()> {
    let server = serve(|task, _| match task {
        t if is(t, ProviderTask::GeneratePrivateKey) => created(),
        t if is(t, PrivateKeyTask::DomainParameters) => tag(false),
        _ => ok(Slot::Unit),
    });
    let key = server
        .provider
        .generate_private_key(4, KeyAttributes::default())?;
    assert!(key.domain_parameters()?.is_none());
    assert_eq!(server.session.live_objects(), 1);
    Ok(())
}

#[test]
fn test_save_key_transfers_ownership() -> Result<()> {
    let server = serve(|task, _| match task {
        t if is(t, ProviderTask::KeyStorageProvider)
            || is(t, ProviderTask::GeneratePrivateKey)
            || is(t, KeyStorageTask::OpenAsOwner) =>
        {
            created()
        }
        _ => ok(Slot::Unit),
    });
    let storage = server.provider.key_storage_provider()?;
    let container = storage.open_as_owner("slot-1")?;
    let key = server.provider.generate_private_key(
        4,
        KeyAttributes {
            is_session: false,
            is_exportable: false,
        },
    )?;
    let key_id = key.object_id();
    let before = server.session.live_objects();

    storage.save_key(&container, key)?;
    assert_eq!(server.session.live_objects(), before - 1);
    let save = &server.requests_for(KeyStorageTask::SaveKey)[0];
    assert_eq!(
        save.slots,
        [Slot::Proxy(container.object_id()), Slot::Proxy(key_id)]
    );

    drop(container);
    drop(storage);
    assert!(!server.journal.destroyed().contains(&key_id));
    assert_eq!(server.journal.destroyed().len(), 2);
    Ok(())
}

#[test]
fn test_failed_save_destroys_key() -> Result<()> {
    let server = serve(|task, _| match task {
        t if is(t, KeyStorageTask::SaveKey) => fail(ErrorCode::AccessViolation),
        _ => created(),
    });
    let storage = server.provider.key_storage_provider()?;
    let container = storage.open_as_user("slot-1")?;
    let key = server
        .provider
        .generate_private_key(4, KeyAttributes::default())?;
    let key_id = key.object_id();

    let err = storage.save_key(&container, key).unwrap_err();
    assert!(matches!(err, Error::Remote(ErrorCode::AccessViolation)));
    assert_eq!(server.journal.destroyed(), [key_id]);
    Ok(())
}

#[test]
fn test_import_object_is_chunked() -> Result<()> {
    let server = serve_with(Config::default(), 1024, |task, _| match task {
        t if is(t, TrustedContainerTask::ImportObject) => ok(Slot::Unit),
        _ => created(),
    });
    let storage = server.provider.key_storage_provider()?;
    let container = storage.open_as_owner("big")?;
    let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    container.import_object(&data)?;

    let chunks: Vec<Vec<u8>> = server
        .requests_for(TrustedContainerTask::ImportObject)
        .into_iter()
        .map(|req| {
            assert_eq!(req.object, container.object_id());
            match &req.slots[..] {
                [Slot::Bytes(b)] => b.clone(),
                other => panic!("unexpected slots {other:?}"),
            }
        })
        .collect();
    assert!(chunks.len() >= 5);
    assert!(chunks.iter().all(|c| c.len() < 1024));
    assert_eq!(chunks.concat(), data);
    Ok(())
}

#[test]
fn test_provider_is_never_destroyed() {
    let server = serve(|task, slots| match task {
        t if is(t, ProviderTask::AlgIdByName) => match slots.first() {
            Some(Slot::Str(name)) if name == "SHA-256" => Slot::U64(0x21),
            _ => Slot::U64(0),
        },
        t if is(t, ProviderTask::AlgName) => ok(Slot::Str("SHA-256".into())),
        _ => fail(ErrorCode::UnknownIdentifier),
    });
    assert_eq!(server.provider.alg_id_by_name("SHA-256").unwrap(), 0x21);
    assert_eq!(
        server.provider.alg_id_by_name("nope").unwrap(),
        keyward_crypto::ALG_ID_UNDEFINED
    );
    assert_eq!(server.provider.alg_name(0x21).unwrap(), "SHA-256");

    let requests = server.journal.requests();
    assert!(
        requests
            .iter()
            .all(|r| r.object == keyward_ipc::ObjectId::PROVIDER)
    );
    let common::Server {
        provider, journal, ..
    } = server;
    drop(provider);
    assert!(journal.destroyed().is_empty());
}
