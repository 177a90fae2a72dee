use std::sync::Arc;

use crate::{
    config::{Config, CoreCapabilities, Limits},
    engine::{dispatcher::RecordClassRegistry, dispatcher::MAX_CALLS_PER_REQUEST, storage::RecordStore},
    extensions,
    extensions::{
        sharing::{Principals, PrincipalsOwner},
        ExtensionRegistry,
    },
    records,
    store::Store,
};

pub mod oauth2;

pub struct Context {
    pub oauth2: oauth2::OAuth2,
    pub store: Arc<Store>,
    pub base_url: url::Url,
    pub core_capabilities: CoreCapabilities,
    pub limits: Limits,
    pub extension_registry: ExtensionRegistry,
    pub record_classes: RecordClassRegistry,
    pub record_store: RecordStore,
}

impl Context {
    pub fn new(config: Config) -> Self {
        assert!(
            config.limits.max_calls_in_request as usize <= MAX_CALLS_PER_REQUEST,
            "limits.max-calls-in-request must be <= {MAX_CALLS_PER_REQUEST}",
        );

        let derived_keys = Arc::new(DerivedKeys::new(&config.private_key));
        let store = Arc::new(Store::from_config(config.store));

        let extension_registry = ExtensionRegistry {
            core: extensions::core::Core {
                core_capabilities: config.core_capabilities,
            },
            sharing_principals: Principals {},
            sharing_principals_owner: PrincipalsOwner {},
        };

        let record_classes = RecordClassRegistry::new(records::all());
        let record_store = RecordStore::new(config.records_store, record_classes.classes())
            .expect("failed to open records store");

        Self {
            oauth2: oauth2::OAuth2::new(store.clone(), derived_keys),
            store,
            base_url: config.base_url,
            core_capabilities: config.core_capabilities,
            limits: config.limits,
            extension_registry,
            record_classes,
            record_store,
        }
    }
}

pub struct DerivedKeys {
    pub(crate) csrf_hmac_key: [u8; argon2::Params::DEFAULT_OUTPUT_LEN],
}

impl DerivedKeys {
    /// Salt used for deriving the CSRF HMAC key
    const CSRF: &'static [u8] = b"CSRFTOKEN";

    /// Instantiates a new [`DerivedKeys`], dropping the private key.
    fn new(private_key: &str) -> Self {
        let argon2 = argon2::Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::DEFAULT,
        );

        Self {
            csrf_hmac_key: Self::derive_key(&argon2, private_key, Self::CSRF),
        }
    }

    fn derive_key(
        argon2: &argon2::Argon2,
        private_key: &str,
        salt: &[u8],
    ) -> [u8; argon2::Params::DEFAULT_OUTPUT_LEN] {
        let mut out = [0_u8; argon2::Params::DEFAULT_OUTPUT_LEN];
        argon2
            .hash_password_into(private_key.as_bytes(), salt, &mut out)
            .unwrap();

        out
    }
}
