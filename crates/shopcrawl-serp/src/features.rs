//! Search-results feature detection.
//!
//! Every known feature has a checker in a fixed table: an ordered fallback
//! chain of container patterns plus a payload builder. A feature is present
//! when any of its patterns matches; the first matching pattern supplies the
//! nodes its payload is read from.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopcrawl_scraper::{element_text, match_records, normalize_text, Document, Query};

use crate::organic::{document_positions, extract_organic_nodes};

/// Characters of answer-box text kept in the payload.
const ANSWER_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    AnswerBox,
    RelatedQuestions,
    ImageCluster,
    VideoCluster,
    ShoppingResults,
    NewsCluster,
    SiteLinks,
    KnowledgePanel,
}

impl FeatureKind {
    pub const ALL: [Self; 8] = [
        Self::AnswerBox,
        Self::RelatedQuestions,
        Self::ImageCluster,
        Self::VideoCluster,
        Self::ShoppingResults,
        Self::NewsCluster,
        Self::SiteLinks,
        Self::KnowledgePanel,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AnswerBox => "answer_box",
            Self::RelatedQuestions => "related_questions",
            Self::ImageCluster => "image_cluster",
            Self::VideoCluster => "video_cluster",
            Self::ShoppingResults => "shopping_results",
            Self::NewsCluster => "news_cluster",
            Self::SiteLinks => "site_links",
            Self::KnowledgePanel => "knowledge_panel",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Features a page can realistically win with its own content.
    #[must_use]
    pub fn is_targetable(self) -> bool {
        matches!(
            self,
            Self::AnswerBox | Self::RelatedQuestions | Self::VideoCluster | Self::ImageCluster
        )
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Detection result for one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureResult {
    pub present: bool,
    /// 1-based vertical slot among all result blocks; `None` when absent.
    pub position: Option<u32>,
    pub payload: BTreeMap<String, Value>,
}

/// Snapshot of every known feature on one results page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerpFeatureSet {
    features: BTreeMap<FeatureKind, FeatureResult>,
}

impl SerpFeatureSet {
    /// A set with every known feature absent.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            features: FeatureKind::ALL
                .into_iter()
                .map(|kind| (kind, FeatureResult::default()))
                .collect(),
        }
    }

    pub fn insert(&mut self, kind: FeatureKind, result: FeatureResult) {
        self.features.insert(kind, result);
    }

    #[must_use]
    pub fn get(&self, kind: FeatureKind) -> Option<&FeatureResult> {
        self.features.get(&kind)
    }

    #[must_use]
    pub fn is_present(&self, kind: FeatureKind) -> bool {
        self.get(kind).is_some_and(|r| r.present)
    }

    /// Present features, in [`FeatureKind`] order.
    pub fn present(&self) -> impl Iterator<Item = FeatureKind> + '_ {
        self.features
            .iter()
            .filter(|(_, r)| r.present)
            .map(|(kind, _)| *kind)
    }

    #[must_use]
    pub fn present_count(&self) -> usize {
        self.present().count()
    }

    #[must_use]
    pub fn known_count(&self) -> usize {
        self.features.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKind, &FeatureResult)> {
        self.features.iter().map(|(kind, r)| (*kind, r))
    }
}

type PayloadFn = fn(&[ElementRef<'_>]) -> BTreeMap<String, Value>;

struct CheckerSpec {
    kind: FeatureKind,
    patterns: &'static [&'static str],
    payload: PayloadFn,
}

/// The checker table. Patterns are ordered most specific first.
const CHECKERS: &[CheckerSpec] = &[
    CheckerSpec {
        kind: FeatureKind::AnswerBox,
        patterns: &[
            "[data-feature=\"answer-box\"]",
            ".xpdopen .kp-blk",
            "div[data-attrid=\"wa:/description\"]",
            ".featured-snippet",
            ".answer-box",
            "#answer-box",
        ],
        payload: answer_box_payload,
    },
    CheckerSpec {
        kind: FeatureKind::RelatedQuestions,
        patterns: &[
            "[data-feature=\"related-questions\"]",
            ".related-question-pair",
            "[jsname=\"Cpkphb\"]",
            ".people-also-ask",
            "#related-questions",
        ],
        payload: related_questions_payload,
    },
    CheckerSpec {
        kind: FeatureKind::ImageCluster,
        patterns: &[
            "[data-feature=\"images\"]",
            "#imagebox_bigimages",
            "#iur",
            ".image-pack",
            ".images-cluster",
        ],
        payload: image_cluster_payload,
    },
    CheckerSpec {
        kind: FeatureKind::VideoCluster,
        patterns: &[
            "[data-feature=\"videos\"]",
            "video-voyager",
            ".video-carousel",
            ".videos-cluster",
        ],
        payload: link_list_payload,
    },
    CheckerSpec {
        kind: FeatureKind::ShoppingResults,
        patterns: &[
            "[data-feature=\"shopping\"]",
            ".commercial-unit-desktop-top",
            ".cu-container",
            ".shopping-results",
        ],
        payload: shopping_payload,
    },
    CheckerSpec {
        kind: FeatureKind::NewsCluster,
        patterns: &[
            "[data-feature=\"news\"]",
            "g-section-with-header[data-hveid] .JJZKK",
            ".top-stories",
            ".news-cluster",
        ],
        payload: link_list_payload,
    },
    CheckerSpec {
        kind: FeatureKind::SiteLinks,
        patterns: &[
            "[data-feature=\"sitelinks\"]",
            "table.jmjoTe",
            ".usJj9c",
            ".sitelinks",
        ],
        payload: link_list_payload,
    },
    CheckerSpec {
        kind: FeatureKind::KnowledgePanel,
        patterns: &[
            "[data-feature=\"knowledge-panel\"]",
            ".kp-wholepage",
            "#rhs .kp-blk",
            ".knowledge-panel",
        ],
        payload: knowledge_panel_payload,
    },
];

static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static QUESTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-q], .related-question, [role=\"heading\"]").expect("valid selector")
});
static HEADING: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-attrid=\"title\"], h2, h3, [role=\"heading\"]").expect("valid selector")
});
static PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".price, [data-price], .e10twf").expect("valid selector")
});

fn text_of(el: ElementRef<'_>) -> String {
    element_text(el)
}

fn texts_within(nodes: &[ElementRef<'_>], selector: &Selector) -> Vec<String> {
    nodes
        .iter()
        .flat_map(|node| node.select(selector))
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect()
}

fn count_within(nodes: &[ElementRef<'_>], selector: &Selector) -> usize {
    nodes.iter().map(|node| node.select(selector).count()).sum()
}

fn answer_box_payload(nodes: &[ElementRef<'_>]) -> BTreeMap<String, Value> {
    let mut payload = BTreeMap::new();
    if let Some(first) = nodes.first() {
        let snippet: String = text_of(*first).chars().take(ANSWER_SNIPPET_CHARS).collect();
        payload.insert("snippet".to_owned(), json!(snippet));
        if let Some(href) = first.select(&LINK).find_map(|a| a.value().attr("href")) {
            payload.insert("source".to_owned(), json!(href));
        }
    }
    payload
}

fn related_questions_payload(nodes: &[ElementRef<'_>]) -> BTreeMap<String, Value> {
    let mut questions: Vec<String> = nodes
        .iter()
        .flat_map(|node| node.select(&QUESTION))
        .map(|el| {
            el.value()
                .attr("data-q")
                .map_or_else(|| text_of(el), normalize_text)
        })
        .filter(|q| !q.is_empty())
        .collect();
    // Per-question containers carry the text directly.
    if questions.is_empty() {
        questions = nodes
            .iter()
            .map(|n| text_of(*n))
            .filter(|q| !q.is_empty())
            .collect();
    }
    questions.dedup();
    BTreeMap::from([
        ("count".to_owned(), json!(questions.len())),
        ("questions".to_owned(), json!(questions)),
    ])
}

fn image_cluster_payload(nodes: &[ElementRef<'_>]) -> BTreeMap<String, Value> {
    BTreeMap::from([("count".to_owned(), json!(count_within(nodes, &IMAGE)))])
}

fn link_list_payload(nodes: &[ElementRef<'_>]) -> BTreeMap<String, Value> {
    let titles = texts_within(nodes, &LINK);
    BTreeMap::from([
        ("count".to_owned(), json!(titles.len())),
        ("titles".to_owned(), json!(titles)),
    ])
}

fn shopping_payload(nodes: &[ElementRef<'_>]) -> BTreeMap<String, Value> {
    let prices = texts_within(nodes, &PRICE);
    BTreeMap::from([
        ("count".to_owned(), json!(count_within(nodes, &LINK))),
        ("prices".to_owned(), json!(prices)),
    ])
}

fn knowledge_panel_payload(nodes: &[ElementRef<'_>]) -> BTreeMap<String, Value> {
    let mut payload = BTreeMap::new();
    if let Some(title) = texts_within(nodes, &HEADING).into_iter().next() {
        payload.insert("title".to_owned(), json!(title));
    }
    payload
}

/// One checker's verdict on a document.
#[derive(Debug)]
pub struct Detection<'a> {
    pub kind: FeatureKind,
    /// First node of the winning pattern; `None` when the feature is absent.
    pub anchor: Option<ElementRef<'a>>,
    pub payload: BTreeMap<String, Value>,
}

struct CompiledChecker {
    kind: FeatureKind,
    patterns: Vec<Query>,
    payload: PayloadFn,
}

/// Compiled checker table.
pub struct FeatureDetector {
    checkers: Vec<CompiledChecker>,
}

impl FeatureDetector {
    /// # Panics
    ///
    /// Never in practice: the checker patterns are constants covered by
    /// tests.
    #[must_use]
    pub fn new() -> Self {
        let checkers = CHECKERS
            .iter()
            .map(|spec| CompiledChecker {
                kind: spec.kind,
                patterns: spec
                    .patterns
                    .iter()
                    .map(|p| Query::parse(p).expect("built-in feature pattern is valid"))
                    .collect(),
                payload: spec.payload,
            })
            .collect();
        Self { checkers }
    }

    /// Runs every checker against `doc`, in table order.
    #[must_use]
    pub fn detect<'a>(&self, doc: &'a Document) -> Vec<Detection<'a>> {
        self.checkers
            .iter()
            .map(|checker| match match_records(doc, &checker.patterns) {
                Some(matched) => {
                    tracing::debug!(
                        feature = checker.kind.name(),
                        pattern = checker.patterns[matched.pattern_index].as_str(),
                        nodes = matched.nodes.len(),
                        "serp feature detected"
                    );
                    Detection {
                        kind: checker.kind,
                        anchor: matched.nodes.first().copied(),
                        payload: (checker.payload)(&matched.nodes),
                    }
                }
                None => Detection {
                    kind: checker.kind,
                    anchor: None,
                    payload: BTreeMap::new(),
                },
            })
            .collect()
    }

    /// Presence and payload of every feature. Positions count features and
    /// organic results together, top to bottom; `page_url` resolves the
    /// organic links.
    #[must_use]
    pub fn feature_set(&self, doc: &Document, page_url: &str) -> SerpFeatureSet {
        let organic: Vec<ElementRef<'_>> = extract_organic_nodes(doc, page_url)
            .into_iter()
            .map(|(node, _)| node)
            .collect();
        position_features(doc, self.detect(doc), &organic)
    }
}

/// Builds the feature set from `detections`, positioning each present
/// feature among all page blocks: detected features plus `organic` nodes,
/// in document order.
pub(crate) fn position_features(
    doc: &Document,
    detections: Vec<Detection<'_>>,
    organic: &[ElementRef<'_>],
) -> SerpFeatureSet {
    let mut anchors = Vec::new();
    let mut blocks: Vec<Option<FeatureKind>> = Vec::new();
    for d in &detections {
        if let Some(anchor) = d.anchor {
            anchors.push(anchor);
            blocks.push(Some(d.kind));
        }
    }
    for node in organic {
        anchors.push(*node);
        blocks.push(None);
    }
    let mut ordered: Vec<(usize, Option<FeatureKind>)> = document_positions(doc, &anchors)
        .into_iter()
        .zip(blocks)
        .collect();
    ordered.sort_by_key(|(index, _)| *index);

    let mut set = SerpFeatureSet::empty();
    for d in detections {
        let position = ordered
            .iter()
            .position(|(_, kind)| *kind == Some(d.kind))
            .and_then(|i| u32::try_from(i + 1).ok());
        set.insert(
            d.kind,
            FeatureResult {
                present: d.anchor.is_some(),
                position,
                payload: d.payload,
            },
        );
    }
    set
}

impl Default for FeatureDetector {
    fn default() -> Self {
        Self::new()
    }
}
