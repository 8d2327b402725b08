//! Backend wiring: which table and auth clients the handlers talk to.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::config::{BackendSettings, Config, defaults};
use crate::error::{AppError, AppResult};
use crate::identity::{GoTrueGateway, IdentityGateway, MemoryIdentityGateway};
use crate::models::Session;
use crate::store::{MemoryStore, RecordStore, RestStore};

#[derive(Clone)]
enum Clients {
    Hosted {
        /// Acts with the public key; scoped per request to the caller's token.
        store: RestStore,
        /// Acts with the service-role key, for admin actions.
        admin_store: RestStore,
        identity: Arc<GoTrueGateway>,
    },
    InMemory {
        store: Arc<MemoryStore>,
        identity: Arc<MemoryIdentityGateway>,
    },
}

/// Shared backend handle, cloned into every worker.
#[derive(Clone)]
pub struct Backend {
    clients: Clients,
    search_function: String,
}

/// HTTP client with the configured transport timeouts.
pub fn build_http_client(settings: &BackendSettings) -> AppResult<Client> {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|e| AppError::Backend(format!("Failed to build HTTP client: {}", e)))
}

impl Backend {
    /// Hosted clients when a backend URL is configured, in-memory otherwise.
    ///
    /// `Config::from_env` already refuses a missing URL in production.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let settings = &config.backend;
        let Some(url) = settings.url.as_deref() else {
            info!("No SUPABASE_URL set, using the in-memory backend");
            return Ok(Self::in_memory(
                Arc::new(MemoryStore::new(&settings.profile_table)),
                Arc::new(MemoryIdentityGateway::new()),
                &settings.search_function,
            ));
        };

        let client = build_http_client(settings)?;
        Ok(Self::hosted(client, url, settings))
    }

    /// Clients for a hosted project at `url`.
    pub fn hosted(client: Client, url: &str, settings: &BackendSettings) -> Self {
        let store = RestStore::new(
            client.clone(),
            url,
            &settings.profile_table,
            settings.anon_key.clone(),
        );
        let admin_store = store.scoped(&settings.service_role_key);
        let identity = GoTrueGateway::new(
            client,
            url,
            settings.anon_key.clone(),
            settings.service_role_key.clone(),
        );

        info!(url, table = %settings.profile_table, "Using hosted backend");

        Self {
            clients: Clients::Hosted {
                store,
                admin_store,
                identity: Arc::new(identity),
            },
            search_function: settings.search_function.clone(),
        }
    }

    /// In-memory backend sharing the given store and gateway.
    pub fn in_memory(
        store: Arc<MemoryStore>,
        identity: Arc<MemoryIdentityGateway>,
        search_function: &str,
    ) -> Self {
        Self {
            clients: Clients::InMemory { store, identity },
            search_function: search_function.to_string(),
        }
    }

    /// Profile store acting as the caller, or anonymously without a session.
    pub fn profiles(&self, session: Option<&Session>) -> Arc<dyn RecordStore> {
        match &self.clients {
            Clients::Hosted { store, .. } => match session {
                Some(session) => Arc::new(store.scoped(&session.access_token)),
                None => Arc::new(store.clone()),
            },
            Clients::InMemory { store, .. } => store.clone(),
        }
    }

    /// Profile store acting with service-role rights.
    pub fn admin_profiles(&self) -> Arc<dyn RecordStore> {
        match &self.clients {
            Clients::Hosted { admin_store, .. } => Arc::new(admin_store.clone()),
            Clients::InMemory { store, .. } => store.clone(),
        }
    }

    pub fn identity(&self) -> Arc<dyn IdentityGateway> {
        match &self.clients {
            Clients::Hosted { identity, .. } => identity.clone(),
            Clients::InMemory { identity, .. } => identity.clone(),
        }
    }

    /// Name of the server-side member search procedure.
    pub fn search_function(&self) -> &str {
        &self.search_function
    }

    /// `hosted` or `memory`, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.clients {
            Clients::Hosted { .. } => "hosted",
            Clients::InMemory { .. } => "memory",
        }
    }
}

impl Default for Backend {
    /// Empty in-memory backend with the default table and procedure names.
    fn default() -> Self {
        Self::in_memory(
            Arc::new(MemoryStore::new(defaults::PROFILE_TABLE)),
            Arc::new(MemoryIdentityGateway::new()),
            defaults::SEARCH_FUNCTION,
        )
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind())
            .field("search_function", &self.search_function)
            .finish()
    }
}
