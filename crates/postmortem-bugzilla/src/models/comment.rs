use crate::record::{FieldTable, Materialize};
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub bug_id: i32,
    pub text: String,
    pub creator: String,
    pub is_private: bool,
}

impl Materialize for Comment {
    fn fields() -> &'static FieldTable<Self> {
        static FIELDS: OnceLock<FieldTable<Comment>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            FieldTable::<Comment>::new()
                .scalar("id", |c, v: i64| c.id = v)
                .scalar("bug_id", |c, v: i32| c.bug_id = v)
                .scalar("text", |c, v: String| c.text = v)
                .scalar("creator", |c, v: String| c.creator = v)
                .scalar("is_private", |c, v: bool| c.is_private = v)
        })
    }
}
