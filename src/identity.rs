//! Identity resolver
//!
//! A chat route token is either a user id (open or create a direct
//! conversation with that user) or a conversation id (typically a group).
//! Both are opaque identifiers of the same shape, so the resolver probes the
//! backend in order instead of guessing: user first, then conversation.

use crate::api::{abortable, ChatApi};
use crate::model::{Conversation, ConversationKind};
use crate::protocol::ConversationDetail;
use crate::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fallback title for groups created without a name
const UNNAMED_GROUP: &str = "Group";

/// Resolve `token` into a conversation
///
/// # Returns
/// * `Ok(Conversation)` - canonical id plus peer or group info
/// * `Err(Error::NotFound)` - neither probe matched; the screen must close
/// * `Err(Error::Aborted)` - `cancel` fired mid-probe
pub async fn resolve(
    api: &dyn ChatApi,
    token: &str,
    local_user_id: &str,
    cancel: &CancellationToken,
) -> Result<Conversation> {
    match resolve_as_user(api, token, cancel).await {
        Ok(conversation) => {
            info!("Route {} resolved to direct conversation {}", token, conversation.id);
            return Ok(conversation);
        }
        Err(Error::Aborted) => return Err(Error::Aborted),
        Err(e) => debug!("Route {} is not a user: {}", token, e),
    }

    match abortable(cancel, api.get_conversation(token)).await {
        Ok(detail) => {
            let conversation = from_detail(detail, local_user_id)?;
            info!("Route {} resolved to existing conversation", token);
            Ok(conversation)
        }
        Err(Error::Aborted) => Err(Error::Aborted),
        Err(e) => {
            warn!("Route {} matched neither user nor conversation: {}", token, e);
            Err(Error::NotFound(token.to_string()))
        }
    }
}

async fn resolve_as_user(
    api: &dyn ChatApi,
    user_id: &str,
    cancel: &CancellationToken,
) -> Result<Conversation> {
    let peer = abortable(cancel, api.get_user(user_id)).await?;
    let id = abortable(cancel, api.create_conversation(&peer.id)).await?;
    Ok(Conversation {
        id,
        kind: ConversationKind::Direct { peer },
    })
}

fn from_detail(detail: ConversationDetail, local_user_id: &str) -> Result<Conversation> {
    let kind = if detail.is_group {
        ConversationKind::Group {
            name: detail
                .group_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNNAMED_GROUP.to_string()),
            participants: detail.participants,
        }
    } else {
        let peer = detail
            .participant
            .or_else(|| {
                detail
                    .participants
                    .into_iter()
                    .find(|p| p.id != local_user_id)
            })
            .ok_or_else(|| Error::NotFound(detail.id.clone()))?;
        ConversationKind::Direct { peer }
    };

    Ok(Conversation {
        id: detail.id,
        kind,
    })
}
