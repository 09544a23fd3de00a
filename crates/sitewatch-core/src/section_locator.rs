//! `SectionLocator` — given a change record and the "after" DOM, identifies
//! the nearest semantic container and a confidence score.
//!
//! Implemented as a fixed ordered list of resolution strategies, each a
//! single operation `(candidate element) -> Option<(SectionType, f64)>`.
//! The first strategy to return a non-null result for a given ancestor
//! wins; ties between ancestors are broken by picking the narrowest
//! (deepest) one, which falls out naturally from walking ancestors
//! innermost-first.

use scraper::{ElementRef, Html, Selector};

use sitewatch_core_types::SectionType;

use crate::models::{ChangeRecord, LocatedSection};

const SEMANTIC_TAGS: &[&str] = &["header", "nav", "main", "section", "article", "aside", "footer"];

/// English/Spanish keyword lists used by strategy 3 (heading match) and the
/// id/class token match in strategy 1.
fn keyword_lists() -> &'static [(SectionType, &'static [&'static str])] {
    &[
        (SectionType::Hero, &["hero", "banner", "jumbotron"]),
        (
            SectionType::Pricing,
            &["pricing", "price", "plans", "precio", "precios", "planes"],
        ),
        (
            SectionType::Features,
            &["features", "feature", "caracteristicas", "características"],
        ),
        (SectionType::Navigation, &["nav", "navigation", "menu", "navegacion", "navegación"]),
        (SectionType::Header, &["header", "encabezado"]),
        (SectionType::Footer, &["footer", "pie", "pie-de-pagina"]),
        (
            SectionType::Testimonials,
            &["testimonials", "testimonial", "reviews", "testimonios", "opiniones"],
        ),
        (SectionType::Cta, &["cta", "call-to-action", "llamada-a-la-accion"]),
        (SectionType::Form, &["form", "signup", "contact-form", "formulario"]),
        (SectionType::About, &["about", "about-us", "nosotros", "quienes-somos", "acerca"]),
        (SectionType::Team, &["team", "equipo", "staff"]),
        (SectionType::Content, &["content", "main-content", "contenido"]),
    ]
}

fn classify_token(token: &str) -> Option<SectionType> {
    let token = token.to_lowercase();
    keyword_lists()
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| token.contains(k)))
        .map(|(ty, _)| *ty)
}

fn element_tokens(el: ElementRef) -> Vec<String> {
    let mut tokens = Vec::new();
    if let Some(id) = el.value().attr("id") {
        tokens.push(id.to_string());
    }
    if let Some(class) = el.value().attr("class") {
        tokens.extend(class.split_whitespace().map(|s| s.to_string()));
    }
    if let Some(section) = el.value().attr("data-section") {
        tokens.push(section.to_string());
    }
    tokens
}

/// Strategy 1: explicit semantic id/class/data-section attribute.
fn strategy_explicit_attribute(el: ElementRef) -> Option<(SectionType, f64)> {
    let has_id_or_data = el.value().attr("id").is_some() || el.value().attr("data-section").is_some();
    for token in element_tokens(el) {
        if let Some(ty) = classify_token(&token) {
            let base = if has_id_or_data { 0.95 } else { 0.75 };
            return Some((ty, base));
        }
    }
    None
}

/// Strategy 2 bonus: +0.10 for a semantic HTML5 element ancestor, applied
/// on top of whatever strategy ultimately resolves the type.
fn semantic_tag_bonus(el: ElementRef) -> f64 {
    if SEMANTIC_TAGS.contains(&el.value().name()) {
        0.10
    } else {
        0.0
    }
}

fn heading_selector() -> Selector {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("static selector is valid")
}

/// Strategy 3: nearest ancestor containing a heading whose text matches a
/// keyword.
fn strategy_heading_keyword(el: ElementRef) -> Option<(SectionType, f64)> {
    let selector = heading_selector();
    for heading in el.select(&selector) {
        let text: String = heading.text().collect::<Vec<_>>().join(" ");
        if let Some(ty) = classify_token(&text) {
            return Some((ty, 0.65));
        }
    }
    None
}

/// Strategy 4: heuristic content match on the element itself.
fn strategy_content_heuristic(el: ElementRef) -> Option<(SectionType, f64)> {
    let text: String = el.text().collect::<Vec<_>>().join(" ");
    let lower = text.to_lowercase();

    let has_currency = text.contains('$') || text.contains('€') || text.contains('£');
    if has_currency {
        return Some((SectionType::Pricing, 0.75));
    }

    let input_selector = Selector::parse("input, textarea, select").expect("static selector is valid");
    if el.select(&input_selector).next().is_some() {
        return Some((SectionType::Form, 0.75));
    }

    if text.trim_start().starts_with('"') || text.trim_start().starts_with('“') {
        if text.len() < 400 {
            return Some((SectionType::Testimonials, 0.6));
        }
    }

    const IMPERATIVES: &[&str] = &[
        "buy now",
        "get started",
        "sign up",
        "start free trial",
        "comprar",
        "empezar",
        "registrate",
        "regístrate",
    ];
    if IMPERATIVES.iter().any(|w| lower.contains(w)) {
        return Some((SectionType::Cta, 0.6));
    }

    None
}

/// Strategy 5: structural patterns, e.g. three or more sibling elements
/// carrying a `.price` class.
fn strategy_structural_pattern(el: ElementRef) -> Option<(SectionType, f64)> {
    let price_selector = Selector::parse(".price").expect("static selector is valid");
    let count = el.select(&price_selector).count();
    if count >= 3 {
        return Some((SectionType::Pricing, 0.7));
    }
    None
}

fn resolve_for_ancestor(el: ElementRef) -> Option<(SectionType, f64)> {
    let mut result = strategy_explicit_attribute(el)
        .or_else(|| strategy_heading_keyword(el))
        .or_else(|| strategy_content_heuristic(el))
        .or_else(|| strategy_structural_pattern(el))?;

    result.1 += semantic_tag_bonus(el);
    result.1 = result.1.clamp(0.0, 1.0);
    Some(result)
}

fn selector_for(el: ElementRef) -> String {
    if let Some(id) = el.value().attr("id") {
        return format!("{}#{}", el.value().name(), id);
    }
    if let Some(class) = el.value().attr("class") {
        if let Some(first) = class.split_whitespace().next() {
            return format!("{}.{}", el.value().name(), first);
        }
    }
    el.value().name().to_string()
}

/// Counts ancestors between `el` and the document root, so candidates can
/// be compared by depth.
fn depth(el: ElementRef) -> usize {
    let mut count = 0;
    let mut current = el.parent().and_then(ElementRef::wrap);
    while let Some(el) = current {
        count += 1;
        current = el.parent().and_then(ElementRef::wrap);
    }
    count
}

/// Finds the element most likely to contain `needle` as rendered text: the
/// deepest (narrowest) element whose aggregated text contains it. `select`
/// visits elements in document/pre-order, so the first match is typically
/// the outermost ancestor (e.g. `<html>`/`<body>`, whose text includes
/// every descendant's); picking the deepest match instead is what lets the
/// later ancestor-walk in `locate` start from the actual containing
/// element rather than skip straight past it.
fn find_candidate<'a>(dom: &'a Html, needle: &str) -> Option<ElementRef<'a>> {
    let all = Selector::parse("*").expect("static selector is valid");
    let snippet: String = needle.chars().take(40).collect();
    let snippet = snippet.trim();
    if snippet.is_empty() {
        return None;
    }
    dom.select(&all)
        .filter(|el| {
            let text: String = el.text().collect::<Vec<_>>().join(" ");
            text.contains(snippet)
        })
        .max_by_key(|el| depth(*el))
}

/// Resolves the semantic section a change record belongs to.
pub fn locate(dom: &Html, record: &ChangeRecord) -> LocatedSection {
    let candidate = find_candidate(dom, &record.value);

    if let Some(candidate) = candidate {
        let mut current = Some(candidate);
        while let Some(el) = current {
            if let Some((section_type, confidence)) = resolve_for_ancestor(el) {
                return LocatedSection {
                    selector: selector_for(el),
                    section_type,
                    confidence,
                };
            }
            current = el.parent().and_then(ElementRef::wrap);
        }
    }

    LocatedSection {
        selector: "body".to_string(),
        section_type: SectionType::Content,
        confidence: 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeRecordKind;

    fn record(value: &str) -> ChangeRecord {
        ChangeRecord {
            kind: ChangeRecordKind::Added,
            value: value.to_string(),
            path_hint: None,
        }
    }

    #[test]
    fn explicit_id_wins_with_high_confidence() {
        let html = r#"<html><body><section id="pricing"><p>$19/month</p></section></body></html>"#;
        let dom = Html::parse_document(html);
        let located = locate(&dom, &record("$19/month"));
        assert_eq!(located.section_type, SectionType::Pricing);
        assert!(located.confidence >= 0.9);
    }

    #[test]
    fn semantic_tag_adds_bonus_on_top_of_class_match() {
        let html = r#"<html><body><footer class="footer-links"><p>contact us</p></footer></body></html>"#;
        let dom = Html::parse_document(html);
        let located = locate(&dom, &record("contact us"));
        assert_eq!(located.section_type, SectionType::Footer);
        assert!(located.confidence >= 0.8);
    }

    #[test]
    fn heading_keyword_resolves_without_class_or_id() {
        let html = r#"<html><body><div><h2>Our Features</h2><p>fast and reliable</p></div></body></html>"#;
        let dom = Html::parse_document(html);
        let located = locate(&dom, &record("fast and reliable"));
        assert_eq!(located.section_type, SectionType::Features);
    }

    #[test]
    fn currency_heuristic_detects_pricing_without_labels() {
        let html = r#"<html><body><div><p>Now only $9.99</p></div></body></html>"#;
        let dom = Html::parse_document(html);
        let located = locate(&dom, &record("Now only $9.99"));
        assert_eq!(located.section_type, SectionType::Pricing);
    }

    #[test]
    fn unmatched_text_falls_back_to_content_with_low_confidence() {
        let html = r#"<html><body><div><p>hash: a1b2c3</p></div></body></html>"#;
        let dom = Html::parse_document(html);
        let located = locate(&dom, &record("a1b2c3"));
        assert_eq!(located.section_type, SectionType::Content);
        assert_eq!(located.confidence, 0.3);
    }

    #[test]
    fn no_candidate_match_falls_back_to_body_content() {
        let html = r#"<html><body><p>unrelated</p></body></html>"#;
        let dom = Html::parse_document(html);
        let located = locate(&dom, &record("text that does not appear anywhere"));
        assert_eq!(located.section_type, SectionType::Content);
        assert_eq!(located.confidence, 0.3);
    }
}
