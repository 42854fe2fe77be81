pub mod chat_llm;
pub mod db;
pub mod json_store;
pub mod notion_api;
