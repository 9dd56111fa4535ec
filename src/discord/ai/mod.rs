// Discord AI module
//
// Mention handling for the classroom assistant.

#[path = "mention_reply.rs"]
pub mod mention_reply;

pub use mention_reply::reply_to_mention;
