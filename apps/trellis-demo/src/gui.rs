use crate::report::describe;
use crate::report::item_label;
use crate::session::Session;
use eframe::egui;
use tr_core::TrellisError;
use tr_core::TrellisResult;
use tr_dom::NodeId;
use tr_menu::Menu;
use tracing::warn;

pub fn run(session: Session) -> TrellisResult<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Trellis Demo")
            .with_inner_size([640.0, 480.0])
            .with_min_inner_size([320.0, 240.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Trellis Demo",
        native_options,
        Box::new(move |_cc| Ok(Box::new(DemoApp::new(session)))),
    )
    .map_err(|error| TrellisError::new("demo.gui_failed", error.to_string()))
}

struct DemoApp {
    session: Session,
    status: String,
}

impl DemoApp {
    fn new(session: Session) -> Self {
        Self {
            session,
            status: "Click a trigger; click the background to dismiss.".to_owned(),
        }
    }

    fn dispatch(&mut self, target: NodeId) {
        let document = self.session.document();
        self.status = match self.session.click_node(target) {
            Ok(prevented) => format!(
                "clicked {}{}",
                describe(document, target),
                if prevented { " (default prevented)" } else { "" }
            ),
            Err(error) => {
                warn!(%error, "click dispatch failed");
                error.to_string()
            }
        };
    }
}

impl eframe::App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut clicked = None;

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let background = ui.interact(ui.max_rect(), ui.id().with("background"), egui::Sense::click());

            let menu = self.session.menu();
            if let Some(trigger) = menu.trigger() {
                let label = self.session.document().text_content(trigger);
                if ui.selectable_label(menu.is_open(), label.trim()).clicked() {
                    clicked = Some(trigger);
                }
            }

            if menu.trigger().is_none() || menu.is_open() {
                show_menu(ui, menu, &mut clicked);
            }

            if clicked.is_none() && background.clicked() {
                clicked = Some(self.session.document().root());
            }
        });

        if let Some(target) = clicked {
            self.dispatch(target);
        }
    }
}

fn show_menu(ui: &mut egui::Ui, menu: &Menu, clicked: &mut Option<NodeId>) {
    let document = menu.document();
    ui.indent(menu.element().index(), |ui| {
        for item in menu.children() {
            let label = item_label(document, item);
            match (item.submenu(), item.link()) {
                (Some(submenu), Some(link)) => {
                    let text = if submenu.is_open() { format!("{label} ▾") } else { format!("{label} ▸") };
                    if ui.selectable_label(item.is_active(), text).clicked() {
                        *clicked = Some(link);
                    }
                    if submenu.is_open() {
                        show_menu(ui, submenu, clicked);
                    }
                }
                (_, Some(link)) => {
                    if ui.link(label).clicked() {
                        *clicked = Some(link);
                    }
                }
                (_, None) => {
                    ui.label(label);
                }
            }
        }
    });
}
