mod category;
mod thread;

pub use category::Category;
pub use thread::{
    new_thread_id, CategoryPageResponse, CreateReplyRequest, CreateThreadRequest, Thread,
    ThreadListResponse, ThreadNode,
};
