//! Outbound I/O for ledgerhound: HTTP fetching, DOM link extraction,
//! and the LLM classifier. Everything here implements a trait from
//! `ledgerhound-core` so the orchestrator never sees a concrete client.

pub mod extract;
pub mod fetcher;
pub mod llm;

pub use extract::DomLinkSource;
pub use fetcher::ReqwestFetcher;
pub use llm::OpenAiClassifier;
