/// A selectable search mode bound into every chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchGroup {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const SEARCH_GROUPS: &[SearchGroup] = &[
    SearchGroup {
        id: "web",
        name: "Web",
        description: "Search across the entire internet",
    },
    SearchGroup {
        id: "buddy",
        name: "Buddy",
        description: "Your personal memory companion",
    },
    SearchGroup {
        id: "academic",
        name: "Academic",
        description: "Search academic papers powered by Exa",
    },
    SearchGroup {
        id: "youtube",
        name: "YouTube",
        description: "Search YouTube videos powered by Exa",
    },
    SearchGroup {
        id: "reddit",
        name: "Reddit",
        description: "Search Reddit posts",
    },
    SearchGroup {
        id: "analysis",
        name: "Analysis",
        description: "Code, stock and currency stuff",
    },
    SearchGroup {
        id: "chat",
        name: "Chat",
        description: "Talk to the model directly.",
    },
    SearchGroup {
        id: "extreme",
        name: "Extreme",
        description: "Deep research with multiple sources and analysis",
    },
];

pub fn find_group(id: &str) -> Option<&'static SearchGroup> {
    SEARCH_GROUPS.iter().find(|group| group.id == id)
}
