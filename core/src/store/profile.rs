use super::RecordStore;
use crate::model::UserProfile;

impl RecordStore {
    pub fn user_profile(&self) -> &UserProfile {
        &self.state.user_profile
    }

    /// Apply `patch` to the profile singleton. Identity and `createdAt`
    /// are preserved.
    pub fn update_user_profile(&mut self, patch: impl FnOnce(&mut UserProfile)) -> UserProfile {
        let profile = &mut self.state.user_profile;
        let (keep_id, keep_created) = (profile.id.clone(), profile.created_at);
        patch(profile);
        profile.id = keep_id;
        profile.created_at = keep_created;
        profile.updated_at = self.clock.now();
        let updated = profile.clone();
        log::debug!("store: profile updated (level {}, {} points)", updated.level, updated.points);
        self.touch();
        updated
    }
}
