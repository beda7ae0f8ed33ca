//! `cache clear`.

use opsdesk_core::{EmailStore, Folder, ListCache};

use super::Context;

/// Drops cached lists and emails, for one folder or all of them.
pub fn clear(ctx: &Context, folder: Option<Folder>) {
    let emails = EmailStore::new(ctx.storage.clone(), ctx.clock.clone());
    let lists = ListCache::new(ctx.storage.clone(), ctx.clock.clone());

    match folder {
        Some(folder) => {
            let cached = emails.index().ids(folder).len();
            lists.clear_folder(folder);
            emails.clear_folder(folder);
            println!("Cleared {cached} cached {folder} emails and their lists");
        }
        None => {
            lists.clear();
            emails.clear();
            println!("Cleared all cached emails and lists");
        }
    }
}
