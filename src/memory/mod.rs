pub mod embeddings;
pub mod extraction;
pub mod framing;
pub mod model;
pub mod preterite;
pub mod repository;
pub mod retrieval;
pub mod storage;

pub use embeddings::{create_embedding_provider, EmbeddingProvider};
pub use extraction::{extract_candidates, MemoryCandidate};
pub use framing::{frame_memories, frame_memory, frame_selected_memories};
pub use model::{
    ElectionStatus, Memory, MemoryType, PersonaMemory, PersonaMemoryType, PersonaOpinion,
    PreteriteMemory, PreteriteReason, RetrievalStrategy,
};
pub use repository::{MemoryRepository, NewMemory};
pub use retrieval::select_for_context;
