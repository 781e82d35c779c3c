use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogContext};
use crate::domain::NewGroup;
use crate::error::HarvestError;
use crate::munge::title_to_name;

/// Looks each group up by name and creates the missing ones. Returns group ids
/// in input order.
///
/// Lookup and creation are separate catalog calls, so two concurrent runs may
/// both decide to create the same group.
pub fn resolve_or_create_groups(
    catalog: &dyn Catalog,
    ctx: &CatalogContext,
    names: &[String],
) -> Result<Vec<String>, HarvestError> {
    debug!(?names, "resolving groups");
    let mut group_ids = Vec::with_capacity(names.len());
    for name in names {
        let found = match catalog.find_group(ctx, name) {
            Ok(found) => found,
            Err(err) => {
                // a failed lookup is handled like a missing group
                warn!(group = %name, error = %err, "group lookup failed, creating it");
                None
            }
        };
        let group = match found {
            Some(group) => {
                info!(group = %group.id, "found the group");
                group
            }
            None => {
                let group = catalog.create_group(
                    ctx,
                    NewGroup {
                        id: name.clone(),
                        name: title_to_name(name),
                        title: name.clone(),
                    },
                )?;
                info!(group = %group.id, "created the group");
                group
            }
        };
        group_ids.push(group.id);
    }
    debug!(?group_ids, "resolved groups");
    Ok(group_ids)
}
