//! Static registry — the compiled-in component library.
//!
//! Each built-in renders a small, deterministic tree from its props and
//! falls back to its own defaults for anything missing. Visual fidelity is
//! the client's concern; these trees carry structure and content only.

use serde::Serialize;
use serde_json::{Value, json};

use crate::document::Descriptor;
use crate::props::display_text;
use crate::render::RenderNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuiltinKind {
    Navbar,
    HeroSection,
    FeatureGrid,
    TextBlock,
    ImageBlock,
    Button,
    CTASection,
    ChatWidget,
    NFTGallery,
    AOMessageSigner,
    Footer,
}

impl BuiltinKind {
    pub const ALL: [BuiltinKind; 11] = [
        Self::Navbar,
        Self::HeroSection,
        Self::FeatureGrid,
        Self::TextBlock,
        Self::ImageBlock,
        Self::Button,
        Self::CTASection,
        Self::ChatWidget,
        Self::NFTGallery,
        Self::AOMessageSigner,
        Self::Footer,
    ];

    /// Canonical (PascalCase) implementation name.
    #[must_use]
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Navbar => "Navbar",
            Self::HeroSection => "HeroSection",
            Self::FeatureGrid => "FeatureGrid",
            Self::TextBlock => "TextBlock",
            Self::ImageBlock => "ImageBlock",
            Self::Button => "Button",
            Self::CTASection => "CTASection",
            Self::ChatWidget => "ChatWidget",
            Self::NFTGallery => "NFTGallery",
            Self::AOMessageSigner => "AOMessageSigner",
            Self::Footer => "Footer",
        }
    }

    /// Kebab-case type id used by the library palette.
    #[must_use]
    pub fn type_id(self) -> &'static str {
        match self {
            Self::Navbar => "navbar",
            Self::HeroSection => "hero-section",
            Self::FeatureGrid => "feature-grid",
            Self::TextBlock => "text-block",
            Self::ImageBlock => "image-block",
            Self::Button => "button",
            Self::CTASection => "cta-section",
            Self::ChatWidget => "chat-widget",
            Self::NFTGallery => "nft-gallery",
            Self::AOMessageSigner => "ao-message-signer",
            Self::Footer => "footer",
        }
    }

    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            Self::Navbar | Self::Footer => "navigation",
            Self::HeroSection | Self::FeatureGrid | Self::CTASection => "sections",
            Self::TextBlock | Self::ImageBlock | Self::Button => "basic",
            Self::ChatWidget => "chat",
            Self::NFTGallery | Self::AOMessageSigner => "arweave",
        }
    }

    #[must_use]
    pub fn default_props(self) -> Value {
        match self {
            Self::Navbar => json!({
                "brand": "Brand",
                "links": [{"label": "Home", "href": "/"}],
            }),
            Self::HeroSection => json!({
                "title": "Build something great",
                "subtitle": "Start from a blank canvas",
                "ctaText": "Get started",
            }),
            Self::FeatureGrid => json!({
                "features": [{"title": "Fast", "description": "Renders instantly"}],
            }),
            Self::TextBlock => json!({"text": "Lorem ipsum"}),
            Self::ImageBlock => json!({"src": "", "alt": "Image"}),
            Self::Button => json!({"label": "Click me", "href": "#"}),
            Self::CTASection => json!({"headline": "Ready?", "buttonText": "Join now"}),
            Self::ChatWidget => json!({"title": "Chat", "placeholder": "Type a message"}),
            Self::NFTGallery => json!({"title": "Gallery", "items": [{"name": "Item", "image": ""}]}),
            Self::AOMessageSigner => json!({"title": "Sign", "processId": ""}),
            Self::Footer => json!({"text": "All rights reserved", "year": 2024}),
        }
    }

    /// Palette entry for this built-in.
    #[must_use]
    pub fn descriptor(self) -> Descriptor {
        Descriptor::new(self.type_id(), self.category(), self.default_props())
    }

    #[must_use]
    pub fn render(self, props: &Value) -> RenderNode {
        let defaults = self.default_props();
        let text = |key: &str| -> String {
            props
                .get(key)
                .or_else(|| defaults.get(key))
                .map(display_text)
                .unwrap_or_default()
        };
        let list = |key: &str| -> Vec<Value> {
            props
                .get(key)
                .or_else(|| defaults.get(key))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        let field = |item: &Value, key: &str| item.get(key).map(display_text).unwrap_or_default();

        let root = RenderNode::element(self.root_tag()).attr("data-component", self.canonical_name());
        match self {
            Self::Navbar => root
                .child(RenderNode::element("strong").child(RenderNode::text(text("brand"))))
                .child(RenderNode::element("ul").children(list("links").iter().map(|link| {
                    RenderNode::element("li").child(
                        RenderNode::element("a")
                            .attr("href", field(link, "href"))
                            .child(RenderNode::text(field(link, "label"))),
                    )
                }))),
            Self::HeroSection => root
                .child(RenderNode::element("h1").child(RenderNode::text(text("title"))))
                .child(RenderNode::element("p").child(RenderNode::text(text("subtitle"))))
                .child(RenderNode::element("button").child(RenderNode::text(text("ctaText")))),
            Self::FeatureGrid => root.children(list("features").iter().map(|feature| {
                RenderNode::element("article")
                    .child(RenderNode::element("h3").child(RenderNode::text(field(feature, "title"))))
                    .child(RenderNode::element("p").child(RenderNode::text(field(feature, "description"))))
            })),
            Self::TextBlock => root.child(RenderNode::text(text("text"))),
            Self::ImageBlock => root.child(
                RenderNode::element("img")
                    .attr("src", text("src"))
                    .attr("alt", text("alt")),
            ),
            Self::Button => root
                .attr("href", text("href"))
                .child(RenderNode::text(text("label"))),
            Self::CTASection => root
                .child(RenderNode::element("h2").child(RenderNode::text(text("headline"))))
                .child(RenderNode::element("button").child(RenderNode::text(text("buttonText")))),
            Self::ChatWidget => root
                .child(RenderNode::element("header").child(RenderNode::text(text("title"))))
                .child(RenderNode::element("input").attr("placeholder", text("placeholder"))),
            Self::NFTGallery => root
                .child(RenderNode::element("h2").child(RenderNode::text(text("title"))))
                .children(list("items").iter().map(|item| {
                    RenderNode::element("figure")
                        .child(RenderNode::element("img").attr("src", field(item, "image")))
                        .child(RenderNode::element("figcaption").child(RenderNode::text(field(item, "name"))))
                })),
            Self::AOMessageSigner => root
                .attr("data-process", text("processId"))
                .child(RenderNode::element("h3").child(RenderNode::text(text("title"))))
                .child(RenderNode::element("textarea"))
                .child(RenderNode::element("button").child(RenderNode::text("Sign message"))),
            Self::Footer => root.child(RenderNode::text(format!("© {} {}", text("year"), text("text")))),
        }
    }

    fn root_tag(self) -> &'static str {
        match self {
            Self::Navbar => "nav",
            Self::HeroSection | Self::FeatureGrid | Self::CTASection | Self::NFTGallery => "section",
            Self::TextBlock => "p",
            Self::ImageBlock => "figure",
            Self::Button => "a",
            Self::ChatWidget | Self::AOMessageSigner => "div",
            Self::Footer => "footer",
        }
    }
}

/// The full static palette, in display order.
#[must_use]
pub fn library() -> Vec<Descriptor> {
    BuiltinKind::ALL
        .iter()
        .map(|kind| kind.descriptor())
        .collect()
}
