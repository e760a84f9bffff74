pub mod admin;
pub mod emoji;
pub mod vector;

pub use admin::{AdminUser, Permission};
pub use emoji::{EmojiCandidate, EmojiRecord, EmotionTone};
pub use vector::{EmbeddingVector, EMBEDDING_DIMENSION};
