use std::sync::Arc;

use crate::k8s::CacheSync;
use crate::queue::WorkQueue;
use crate::reconciler::Reconciler;
use crate::types::ObjectKey;

/// Application dependencies - simple struct with Arc-wrapped services
pub struct ApplicationServices {
    pub queue: WorkQueue<ObjectKey>,
    pub reconciler: Arc<Reconciler>,
    pub cache_sync: CacheSync,
}
