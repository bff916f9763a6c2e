use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    api::error::{self, SocialError},
    modules::{
        graph::{
            model::{PageRequest, Slice},
            repository::SocialGraphRepository,
        },
        group::repository::GroupRepository,
        user::{model::UserProfile, repository::UserRepository},
    },
};

/// Paginated, read-only views over the relationship graph.
///
/// Each listing fetches one row past the page to set `has_more_items`
/// without counting.
#[derive(Clone)]
pub struct GraphService<Q, G, U>
where
    Q: SocialGraphRepository + Send + Sync,
    G: GroupRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    graph_repo: Arc<Q>,
    group_repo: Arc<G>,
    user_repo: Arc<U>,
}

impl<Q, G, U> GraphService<Q, G, U>
where
    Q: SocialGraphRepository + Send + Sync,
    G: GroupRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(graph_repo: Arc<Q>, group_repo: Arc<G>, user_repo: Arc<U>) -> Self {
        GraphService { graph_repo, group_repo, user_repo }
    }

    pub async fn friends_of(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Slice<Uuid>, error::SystemError> {
        check_page(&page)?;
        let rows =
            self.graph_repo.find_friend_ids(&user_id, page.offset(), page.fetch_limit()).await?;
        Ok(Slice::from_overfetch(rows, page))
    }

    pub async fn friends_of_group(
        &self,
        group_id: Uuid,
        page: PageRequest,
    ) -> Result<Slice<Uuid>, error::SystemError> {
        check_page(&page)?;
        if self.group_repo.find_group(&group_id).await?.is_none() {
            return Err(SocialError::GroupNotFound.into());
        }
        let rows = self
            .graph_repo
            .find_group_member_ids(&group_id, page.offset(), page.fetch_limit())
            .await?;
        Ok(Slice::from_overfetch(rows, page))
    }

    /// Same as [`Self::friends_of_group`] but hides groups `owner_id` does not own.
    pub async fn friends_of_owned_group(
        &self,
        owner_id: Uuid,
        group_id: Uuid,
        page: PageRequest,
    ) -> Result<Slice<Uuid>, error::SystemError> {
        match self.group_repo.find_group(&group_id).await? {
            Some(group) if group.owner_id == owner_id => self.friends_of_group(group_id, page).await,
            _ => Err(SocialError::GroupNotFound.into()),
        }
    }

    pub async fn blocked_by(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Slice<Uuid>, error::SystemError> {
        check_page(&page)?;
        let rows =
            self.graph_repo.find_blocked_ids(&user_id, page.offset(), page.fetch_limit()).await?;
        Ok(Slice::from_overfetch(rows, page))
    }

    pub async fn requests_to(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Slice<Uuid>, error::SystemError> {
        check_page(&page)?;
        let rows = self
            .graph_repo
            .find_incoming_request_ids(&user_id, page.offset(), page.fetch_limit())
            .await?;
        Ok(Slice::from_overfetch(rows, page))
    }

    pub async fn requests_from(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Slice<Uuid>, error::SystemError> {
        check_page(&page)?;
        let rows = self
            .graph_repo
            .find_outgoing_request_ids(&user_id, page.offset(), page.fetch_limit())
            .await?;
        Ok(Slice::from_overfetch(rows, page))
    }

    /// Swaps ids for display profiles, keeping order. Ids the profile store no
    /// longer knows are dropped; `has_more_items` is left as computed.
    pub async fn resolve_profiles(
        &self,
        slice: Slice<Uuid>,
    ) -> Result<Slice<UserProfile>, error::SystemError> {
        let mut by_id: HashMap<Uuid, UserProfile> = self
            .user_repo
            .find_by_ids(&slice.items)
            .await?
            .into_iter()
            .map(|user| (user.id, UserProfile::from(user)))
            .collect();

        let profiles = slice.items.iter().filter_map(|id| by_id.remove(id)).collect();
        Ok(slice.with_items(profiles))
    }
}

fn check_page(page: &PageRequest) -> Result<(), error::SystemError> {
    if page.page_size == 0 {
        return Err(error::SystemError::bad_request("Page size must be at least 1"));
    }
    Ok(())
}
