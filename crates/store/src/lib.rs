mod build;
mod champion;
mod comment;
mod expr;
pub mod marshal;
mod reference;

pub use build::{
    Build, BuildPatch, BuildStore, DeleteOutcome, FavoriteToggle, LikeOutcome, UpdateOutcome,
};
pub use champion::{ChampionStore, ChampionWrite};
pub use comment::{
    clamp_reply, descendants_of, Comment, CommentDelete, CommentStore, CommentUpdate,
};
pub use expr::UpdateExpr;
pub use reference::ReferenceStore;

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};

/// A failed `ConditionExpression` is flow control here (duplicate id, wrong
/// owner, toggle direction), everything else is a real store error.
pub(crate) fn is_conditional_failure<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    matches!(
        err.as_service_error().and_then(|e| e.code()),
        Some("ConditionalCheckFailedException")
    )
}
