// =============================================================================
// Page-level tests: events, injected stylesheets, plugins
// =============================================================================

use std::cell::Cell;
use std::rc::Rc;

use sprig::{Page, Plugin};

fn counter() -> (Rc<Cell<u32>>, impl FnMut(&sprig::Event) + 'static) {
    let count = Rc::new(Cell::new(0));
    let inner = count.clone();
    (count, move |_: &sprig::Event| inner.set(inner.get() + 1))
}

fn page_with_buttons() -> Page {
    Page::parse(
        r#"<html><head></head><body>
            <button id="x">x</button>
            <button id="y">y</button>
        </body></html>"#,
    )
}

// -----------------------------------------------------------------------------
// Events
// -----------------------------------------------------------------------------

#[test]
fn trigger_runs_listeners() {
    let page = page_with_buttons();
    let (count, cb) = counter();
    let x = page.select("#x").on("click", cb);
    x.click();
    x.click();
    assert_eq!(count.get(), 2);
}

#[test]
fn once_fires_exactly_once() {
    let page = page_with_buttons();
    let (count, cb) = counter();
    let x = page.select("#x").on_once("click", cb);
    x.click();
    x.click();
    x.click();
    assert_eq!(count.get(), 1);
}

#[test]
fn listeners_fire_on_every_element_of_the_set() {
    let page = page_with_buttons();
    let (count, cb) = counter();
    let buttons = page.select("button").on("click", cb);
    buttons.click();
    assert_eq!(count.get(), 2);
    page.select("#y").click();
    assert_eq!(count.get(), 3);
}

#[test]
fn off_removes_every_listener_for_the_event() {
    let page = page_with_buttons();
    let (count, cb) = counter();
    let (other, cb2) = counter();
    let x = page.select("#x");
    x.on("click", cb);
    x.on("hover", cb2);
    x.off("click");
    x.click();
    x.trigger("hover");
    assert_eq!(count.get(), 0);
    assert_eq!(other.get(), 1);
}

#[test]
fn off_listener_spares_the_others() {
    let page = page_with_buttons();
    let (first, cb1) = counter();
    let (second, cb2) = counter();
    let x = page.select("#x");
    let id = x.bind("click", cb1);
    x.bind("click", cb2);
    x.off_listener("click", id);
    x.click();
    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 1);
}

#[test]
fn one_listener_id_spans_the_whole_set() {
    let page = page_with_buttons();
    let (count, cb) = counter();
    let buttons = page.select("button");
    let id = buttons.bind("click", cb);
    buttons.off_listener("click", id);
    buttons.click();
    assert_eq!(count.get(), 0);
}

#[test]
fn event_carries_name_and_target() {
    let page = page_with_buttons();
    let seen = Rc::new(Cell::new(None));
    let inner = seen.clone();
    let x = page.select("#x");
    x.on("submit", move |ev| inner.set(Some((ev.name.clone(), ev.target))));
    x.trigger("submit");
    let (name, target) = seen.take().expect("listener should have run");
    assert_eq!(name, "submit");
    assert_eq!(Some(target), x.node());
}

#[test]
fn listeners_may_touch_the_page() {
    // Dispatch holds no internal borrows while callbacks run
    let page = page_with_buttons();
    let p = page.clone();
    let x = page.select("#x");
    x.on("click", move |ev| {
        p.select(ev.target).set_text("clicked");
        p.select("#y").add_class("sibling");
    });
    x.click();
    assert_eq!(page.select("#x").text().as_deref(), Some("clicked"));
    assert!(page.select("#y").has_class("sibling"));
}

#[test]
fn trigger_on_empty_set_is_a_no_op() {
    let page = page_with_buttons();
    page.select("#missing").click();
}

// -----------------------------------------------------------------------------
// Injected stylesheets
// -----------------------------------------------------------------------------

#[test]
fn injected_css_lands_in_head() {
    let page = page_with_buttons();
    let id = page.inject_css("button { color: red; }").expect("has a head");
    let styles = page.select("head style");
    assert_eq!(styles.len(), 1);
    assert_eq!(styles.attr("id").as_deref(), Some(id.as_str()));
    assert_eq!(styles.text().as_deref(), Some("button { color: red; }"));
}

#[test]
fn css_content_is_not_escaped() {
    let page = page_with_buttons();
    page.inject_css_as("raw", "a > b { content: \"&\"; }");
    assert!(page.html().contains("a > b { content: \"&\"; }"));
}

#[test]
fn remove_and_clear_css() {
    let page = page_with_buttons();
    let a = page.inject_css("a {}").expect("has a head");
    page.inject_css("b {}").expect("has a head");
    assert_eq!(page.select("head style").len(), 2);

    assert!(page.remove_css(&a));
    assert_eq!(page.select("head style").len(), 1);

    page.clear_css();
    assert!(page.select("head style").is_empty());
}

// -----------------------------------------------------------------------------
// Plugins and commands
// -----------------------------------------------------------------------------

struct DataPlugin;

impl Plugin for DataPlugin {
    fn install(&self, page: &Page) {
        page.register("data", |set, key| set.attr(&format!("data-{key}")));
    }
}

#[test]
fn plugin_commands_are_invokable() {
    let page = page_with_buttons();
    page.install(DataPlugin);
    page.select("#x").set_attr("data-role", "primary");

    assert_eq!(
        page.select("#x").invoke("data", "role").as_deref(),
        Some("primary")
    );
    assert_eq!(page.select("#x").invoke("data", "missing"), None);
    assert_eq!(page.select("#x").invoke("unregistered", "role"), None);
}

#[test]
fn closure_plugins_and_clones_share_state() {
    let page = page_with_buttons();
    let clone = page.clone();
    clone.install(|p: &Page| {
        p.register("tag", |set, _| set.attr("id"));
    });
    // Registered through the clone, visible through the original
    assert_eq!(page.select("#y").invoke("tag", "").as_deref(), Some("y"));
}

#[test]
fn later_registration_replaces_the_command() {
    let page = page_with_buttons();
    page.register("greet", |_, _| Some("hello".to_string()));
    page.register("greet", |_, _| Some("goodbye".to_string()));
    assert_eq!(
        page.select("#x").invoke("greet", "").as_deref(),
        Some("goodbye")
    );
}
