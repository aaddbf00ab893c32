//! Scripted in-memory page for driving the explorer without a browser.
//!
//! A [`FakePage`] is a small state machine of [`Screen`]s. Clicking an element
//! with a registered transition switches screens; filled input values show up
//! as the input's text in later snapshots.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use ui_explorer::browser::page::{ElementDescriptor, ElementInfo, ElementQuery, ExplorerPage};
use ui_explorer::browser::probe::MutationState;
use ui_explorer::snapshot::{RawDialog, RawNode, RawSnapshot};
use ui_explorer::{ExplorerError, Result};

#[derive(Debug, Clone, Default)]
pub struct Screen {
    pub title: String,
    nodes: Vec<(usize, RawNode)>,
    dialogs: Vec<RawDialog>,
    dialog_controls: Vec<ElementInfo<usize>>,
    clickables: Vec<ElementInfo<usize>>,
    toggles: Vec<ElementInfo<usize>>,
    inputs: Vec<ElementInfo<usize>>,
    transitions: HashMap<usize, usize>,
}

fn descriptor(tag: &str, text: &str, width: f64, height: f64) -> ElementDescriptor {
    ElementDescriptor {
        tag: tag.to_string(),
        text: text.to_string(),
        width,
        height,
        styled_visible: true,
        ..Default::default()
    }
}

fn raw_node(d: &ElementDescriptor) -> RawNode {
    RawNode {
        tag: d.tag.clone(),
        role: d.role.clone(),
        class_name: Some(d.class_name.clone()),
        input_type: d.input_type.clone(),
        label: d.label.clone(),
        text: d.text.clone(),
        width: d.width,
        height: d.height,
        styled_visible: d.styled_visible,
        ..Default::default()
    }
}

impl Screen {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn control(mut self, id: usize, d: ElementDescriptor) -> Self {
        self.nodes.push((id, raw_node(&d)));
        self.clickables.push(ElementInfo {
            handle: id,
            descriptor: d,
        });
        self
    }

    pub fn button(self, id: usize, text: &str) -> Self {
        self.control(id, descriptor("button", text, 120.0, 32.0))
    }

    pub fn link(self, id: usize, text: &str) -> Self {
        self.control(id, descriptor("a", text, 80.0, 18.0))
    }

    /// Zero-size control: present in the DOM, invisible to the explorer.
    pub fn hidden_button(self, id: usize, text: &str) -> Self {
        self.control(id, descriptor("button", text, 0.0, 0.0))
    }

    pub fn dialog(mut self, text: &str) -> Self {
        self.dialogs.push(RawDialog {
            tag: "div".to_string(),
            class_name: Some("modal".to_string()),
            text: text.to_string(),
            ..Default::default()
        });
        self
    }

    pub fn dialog_button(mut self, id: usize, text: &str) -> Self {
        let d = descriptor("button", text, 90.0, 30.0);
        self.nodes.push((id, raw_node(&d)));
        self.dialog_controls.push(ElementInfo {
            handle: id,
            descriptor: d,
        });
        self
    }

    pub fn toggle(mut self, id: usize, text: &str) -> Self {
        let mut d = descriptor("div", text, 40.0, 20.0);
        d.role = Some("menu".to_string());
        self.nodes.push((id, raw_node(&d)));
        self.toggles.push(ElementInfo {
            handle: id,
            descriptor: d,
        });
        self
    }

    pub fn input(mut self, id: usize, input_type: &str) -> Self {
        let mut d = descriptor("input", "", 200.0, 28.0);
        d.input_type = Some(input_type.to_string());
        self.nodes.push((id, raw_node(&d)));
        self.inputs.push(ElementInfo {
            handle: id,
            descriptor: d,
        });
        self
    }

    pub fn on_click(mut self, id: usize, next_screen: usize) -> Self {
        self.transitions.insert(id, next_screen);
        self
    }
}

#[derive(Default)]
pub struct FakePage {
    screens: Vec<Screen>,
    current: Mutex<usize>,
    values: Mutex<HashMap<usize, String>>,
    pub clicks: Mutex<Vec<usize>>,
    pub fills: Mutex<Vec<(usize, String)>>,
    pub navigations: Mutex<Vec<String>>,
    pub probe_installs: Mutex<usize>,
    failing_clicks: HashSet<usize>,
    hanging_clicks: HashSet<usize>,
    failing_fields: HashSet<usize>,
    failing_input_query: bool,
    mutation: Mutex<MutationState>,
    unreachable: bool,
}

impl FakePage {
    pub fn new(screens: Vec<Screen>) -> Self {
        Self {
            screens,
            ..Default::default()
        }
    }

    /// Every snapshot fails as if the page were gone.
    pub fn unreachable() -> Self {
        Self {
            screens: vec![Screen::new("gone")],
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn failing_click(mut self, id: usize) -> Self {
        self.failing_clicks.insert(id);
        self
    }

    pub fn hanging_click(mut self, id: usize) -> Self {
        self.hanging_clicks.insert(id);
        self
    }

    pub fn failing_field(mut self, id: usize) -> Self {
        self.failing_fields.insert(id);
        self
    }

    /// Enumerating form fields fails, as if the page navigated mid-query.
    pub fn failing_input_query(mut self) -> Self {
        self.failing_input_query = true;
        self
    }

    pub fn set_mutation_state(&self, state: MutationState) {
        *self.mutation.lock().unwrap() = state;
    }

    pub fn current_screen(&self) -> usize {
        *self.current.lock().unwrap()
    }

    pub fn click_log(&self) -> Vec<usize> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn fill_log(&self) -> Vec<(usize, String)> {
        self.fills.lock().unwrap().clone()
    }

    fn screen(&self) -> &Screen {
        &self.screens[self.current_screen()]
    }
}

#[async_trait]
impl ExplorerPage for FakePage {
    type Handle = usize;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        *self.current.lock().unwrap() = 0;
        self.values.lock().unwrap().clear();
        Ok(())
    }

    async fn install_mutation_probe(&self) -> Result<()> {
        *self.probe_installs.lock().unwrap() += 1;
        Ok(())
    }

    async fn mutation_state(&self) -> Result<MutationState> {
        Ok(*self.mutation.lock().unwrap())
    }

    async fn raw_snapshot(&self) -> Result<RawSnapshot> {
        if self.unreachable {
            return Err(ExplorerError::PageUnavailable("fake page closed".to_string()));
        }
        let screen = self.screen();
        let values = self.values.lock().unwrap();
        let nodes = screen
            .nodes
            .iter()
            .map(|(id, node)| {
                let mut node = node.clone();
                if let Some(value) = values.get(id) {
                    node.text = value.clone();
                }
                node
            })
            .collect();
        Ok(RawSnapshot {
            title: screen.title.clone(),
            nodes,
            dialogs: screen.dialogs.clone(),
        })
    }

    async fn query(&self, query: ElementQuery) -> Result<Vec<ElementInfo<usize>>> {
        if self.unreachable {
            return Err(ExplorerError::PageUnavailable("fake page closed".to_string()));
        }
        if self.failing_input_query && query == ElementQuery::TextInputs {
            return Err(ExplorerError::PageUnavailable(
                "execution context destroyed".to_string(),
            ));
        }
        let screen = self.screen();
        Ok(match query {
            ElementQuery::DialogControls => screen.dialog_controls.clone(),
            ElementQuery::Clickables => screen.clickables.clone(),
            ElementQuery::Toggles => screen.toggles.clone(),
            ElementQuery::TextInputs => screen.inputs.clone(),
        })
    }

    async fn click(&self, handle: &usize) -> Result<()> {
        self.clicks.lock().unwrap().push(*handle);
        if self.hanging_clicks.contains(handle) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing_clicks.contains(handle) {
            return Err(ExplorerError::ElementNotFound(format!("element {}", handle)));
        }
        let next = self.screen().transitions.get(handle).copied();
        if let Some(next) = next {
            *self.current.lock().unwrap() = next;
            self.values.lock().unwrap().clear();
        }
        Ok(())
    }

    async fn set_value(&self, handle: &usize, value: &str) -> Result<()> {
        if self.failing_fields.contains(handle) {
            return Err(ExplorerError::Other(format!("field {} is read-only", handle)));
        }
        self.fills
            .lock()
            .unwrap()
            .push((*handle, value.to_string()));
        self.values
            .lock()
            .unwrap()
            .insert(*handle, value.to_string());
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(format!("png:{}", self.screen().title).into_bytes())
    }

    async fn content(&self) -> Result<String> {
        Ok(format!(
            "<html><head><title>{}</title></head><body></body></html>",
            self.screen().title
        ))
    }

    async fn url(&self) -> Result<String> {
        Ok(format!("http://fake.test/screen/{}", self.current_screen()))
    }
}

/// Fresh, unique output directory under the system temp dir.
pub fn temp_output_dir(test_name: &str) -> std::path::PathBuf {
    let unique = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join("ui-explorer-tests")
        .join(format!("{}-{}", test_name, unique))
}
