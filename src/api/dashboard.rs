use axum::extract::State;
use axum::response::Html;
use log::{info, warn};
use std::fmt::Write;
use strum::IntoEnumIterator;

use super::AppState;
use super::groups::groups_with_members;
use crate::model::{Area, Group, ReportKind};

const HEAD: &str = r#"<html>
<head>
<script>
function on(groupId) { window.location.replace('/groupOn?group=' + groupId); }
function off(groupId) { window.location.replace('/groupOff?group=' + groupId); }
</script>
</head>
<body>
<h1>Domicile</h1>
"#;

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn render(areas: &[Area], groups: &[Group]) -> String {
    let mut html = String::from(HEAD);

    for area in areas {
        let _ = writeln!(html, "<strong>{}</strong><br /><br />", escape(&area.name));
        for kind in ReportKind::iter() {
            let _ = writeln!(
                html,
                "<a href=\"/reports?area={}&type={}\">{} reports</a><br />",
                area.uuid,
                kind,
                capitalize(kind.as_ref())
            );
        }
        html.push_str("<br /><br />\n");
    }

    html.push_str("<strong>Groups</strong><br /><br />\n");
    for group in groups {
        html.push_str(&escape(&group.friendly_name));
        if group.members.is_empty() {
            html.push_str("<br /><br />\n<em>No devices in group</em><br />\n");
        } else {
            let _ = writeln!(
                html,
                " -- <button onClick=\"on({id})\">Toggle on</button> -- <button onClick=\"off({id})\">Toggle off</button><br /><br />",
                id = group.id
            );
            for member in &group.members {
                let name = member
                    .friendly_name
                    .as_deref()
                    .unwrap_or(&member.ieee_address);
                let _ = writeln!(html, "{}<br />", escape(name));
            }
        }
        html.push_str("<br /><br />\n");
    }

    html.push_str("</body></html>\n");
    html
}

/// `GET /`
///
/// Listing failures degrade to an emptier page instead of an error.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    info!("[HTTP] GET /");

    let areas = state.stores.areas.list_areas().await.unwrap_or_else(|e| {
        warn!("[HTTP] Unable to list areas: {}", e);
        Vec::new()
    });
    let groups = groups_with_members(&state.stores)
        .await
        .unwrap_or_else(|e| {
            warn!("[HTTP] Unable to list groups: {}", e);
            Vec::new()
        });

    Html(render(&areas, &groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_state;
    use crate::store::memory;

    #[tokio::test]
    async fn test_dashboard_lists_areas_and_groups() {
        let (store, state) = test_state();
        let area = memory::area(1, "Living <Room>");
        store.insert_area(area.clone());
        store.insert_device(memory::device("0x1", "Floor Lamp", true));
        store.insert_group(memory::group(3, "Lamps", true), &["0x1"]);
        store.insert_group(memory::group(4, "Empty", true), &[]);

        let Html(page) = index(State(state)).await;

        assert!(page.contains("Living &lt;Room&gt;"));
        assert!(page.contains(&format!("/reports?area={}&type=illuminance", area.uuid)));
        assert!(page.contains("Temperature reports"));
        assert!(page.contains("on(3)"));
        assert!(!page.contains("on(4)"));
        assert!(page.contains("Floor Lamp"));
        assert!(page.contains("No devices in group"));
    }

    #[test]
    fn test_member_without_device_shows_address() {
        let mut group = memory::group(1, "G", true);
        group.members.push(crate::model::GroupMember {
            group_id: 1,
            ieee_address: "0xfeed".to_string(),
            friendly_name: None,
        });
        assert!(render(&[], &[group]).contains("0xfeed<br />"));
    }
}
