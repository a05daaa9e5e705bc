pub mod memory;
pub mod realtime;
pub mod supabase;
pub mod traits;
pub mod types;

use std::sync::Arc;

pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;
pub use traits::{AuthProvider, ChangeFeed, ListingStore, ObjectStorage};
pub use types::{Credentials, Registration, Subscription};

/// The single configured handle to the hosted backend that screens talk to
#[derive(Clone)]
pub struct Backend {
    pub listings: Arc<dyn ListingStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub feed: Arc<dyn ChangeFeed>,
}

impl Backend {
    pub fn supabase(client: Arc<SupabaseClient>) -> Self {
        Self {
            listings: client.clone(),
            auth: client.clone(),
            storage: client.clone(),
            feed: client,
        }
    }

    pub fn in_memory(memory: Arc<MemoryBackend>) -> Self {
        Self {
            listings: memory.clone(),
            auth: memory.clone(),
            storage: memory.clone(),
            feed: memory,
        }
    }
}
