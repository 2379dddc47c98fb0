pub mod groq;
pub mod provider;
pub mod sse;
