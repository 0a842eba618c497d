use egui::{Align2, Color32, Context, RichText, vec2};
use nebula_actors::SessionStats;

/// Which overlay the desktop shows over the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    Paused,
    GameOver,
}

/// A button the player pressed this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Play,
    Resume,
    Restart,
    Quit,
}

pub struct HudView<'a> {
    pub screen: Screen,
    pub stats: &'a SessionStats,
    pub max_health: f32,
    pub best_score: u64,
}

/// Lay out the overlay for the current screen.
pub fn draw(ctx: &Context, view: &HudView<'_>) -> Option<UiAction> {
    if matches!(view.screen, Screen::Playing | Screen::Paused) {
        hud(ctx, view.stats, view.max_health);
    }

    match view.screen {
        Screen::Playing => None,
        Screen::Menu => centered(ctx, "NEBULA STRIKE", |ui| {
            ui.label("WASD or arrows to fly, click or Space to fire, Esc to pause");
            ui.add_space(8.0);
            buttons(ui, &[("Play", UiAction::Play), ("Quit", UiAction::Quit)])
        }),
        Screen::Paused => centered(ctx, "PAUSED", |ui| {
            buttons(
                ui,
                &[
                    ("Resume", UiAction::Resume),
                    ("Restart", UiAction::Restart),
                    ("Quit", UiAction::Quit),
                ],
            )
        }),
        Screen::GameOver => centered(ctx, "GAME OVER", |ui| {
            ui.label(format!(
                "Score {}   Kills {}",
                view.stats.score, view.stats.kills
            ));
            ui.label(format!("Best {}", view.best_score));
            ui.add_space(8.0);
            buttons(
                ui,
                &[("Play again", UiAction::Restart), ("Quit", UiAction::Quit)],
            )
        }),
    }
}

fn hud(ctx: &Context, stats: &SessionStats, max_health: f32) {
    egui::Area::new(egui::Id::new("hud"))
        .anchor(Align2::LEFT_TOP, vec2(16.0, 16.0))
        .show(ctx, |ui| {
            ui.label(
                RichText::new(format!("Score: {}", stats.score))
                    .size(20.0)
                    .color(Color32::WHITE),
            );
            let fraction = if max_health > 0.0 {
                (stats.health / max_health).clamp(0.0, 1.0)
            } else {
                0.0
            };
            ui.add(
                egui::ProgressBar::new(fraction)
                    .desired_width(180.0)
                    .fill(Color32::from_rgb(0x00, 0xaa, 0x66))
                    .text(format!("Health {:.0}", stats.health.max(0.0))),
            );
            ui.label(
                RichText::new(format!("Lives: {}   Kills: {}", stats.lives, stats.kills))
                    .color(Color32::LIGHT_GRAY),
            );
        });
}

fn centered(
    ctx: &Context,
    title: &str,
    add: impl FnOnce(&mut egui::Ui) -> Option<UiAction>,
) -> Option<UiAction> {
    egui::Window::new(title)
        .anchor(Align2::CENTER_CENTER, vec2(0.0, 0.0))
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading(RichText::new(title).size(32.0).strong());
                ui.add_space(12.0);
                add(ui)
            })
            .inner
        })
        .and_then(|response| response.inner.flatten())
}

fn buttons(ui: &mut egui::Ui, items: &[(&str, UiAction)]) -> Option<UiAction> {
    let mut picked = None;
    for (label, action) in items {
        if ui
            .add_sized([160.0, 32.0], egui::Button::new(*label))
            .clicked()
        {
            picked = Some(*action);
        }
    }
    picked
}
