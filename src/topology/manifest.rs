//! Parser for `contents.xcworkspacedata` manifests.
//!
//! ```xml
//! <Workspace version = "1.0">
//!    <Group location = "group:Modules" name = "Modules">
//!       <FileRef location = "group:Core/Core.xcodeproj"></FileRef>
//!    </Group>
//!    <FileRef location = "container:App/App.xcodeproj"></FileRef>
//! </Workspace>
//! ```

use super::location::Location;

const GROUP_TAG: &str = "Group";
const REFERENCE_TAG: &str = "FileRef";
const LOCATION_ATTR: &str = "location";

/// One project reference found in a manifest, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Locations of the enclosing groups, outermost first. Groups without
    /// a usable location are left out.
    pub groups: Vec<Location>,
    pub location: Location,
}

/// Parse a manifest document into its references.
///
/// References whose location scheme is unknown are dropped.
pub fn parse_manifest(content: &str) -> Result<Vec<ManifestEntry>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(content)?;
    let mut entries = Vec::new();
    let mut groups = Vec::new();
    collect(doc.root_element(), &mut groups, &mut entries);
    Ok(entries)
}

fn collect(node: roxmltree::Node<'_, '_>, groups: &mut Vec<Location>, out: &mut Vec<ManifestEntry>) {
    for child in node.children().filter(|n| n.is_element()) {
        let location = child.attribute(LOCATION_ATTR);

        if child.has_tag_name(REFERENCE_TAG) {
            match location.and_then(Location::parse) {
                Some(location) => out.push(ManifestEntry {
                    groups: groups.clone(),
                    location,
                }),
                None => {
                    crate::debug_event!("topology", "ignored reference", "{location:?}");
                }
            }
        } else if child.has_tag_name(GROUP_TAG) {
            let parsed = location.and_then(Location::parse);
            let pushed = parsed.is_some();
            if let Some(group) = parsed {
                groups.push(group);
            }
            collect(child, groups, out);
            if pushed {
                groups.pop();
            }
        }
    }
}
