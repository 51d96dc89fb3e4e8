pub mod db;
pub mod redraft_llm;

pub use db::PgClientStore;
pub use redraft_llm::OpenAiRedraftAdapter;
