//! Static topic knowledge base loaded from a JSON file.
//!
//! File format: a top-level object; each key is a topic name and each value an object with
//! optional `aliases` (array of strings), `description`, `details`, `website`, `contact`.
//!
//! ```json
//! {
//!   "CoffeeShop": {
//!     "aliases": ["coffee", "cafe"],
//!     "description": "Best beans in town",
//!     "website": "https://coffee.example"
//!   }
//! }
//! ```

mod store;

pub use store::{KnowledgeError, KnowledgeStore, TopicRecord, NO_DESCRIPTION};
