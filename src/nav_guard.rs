//! Confirmation before leaving a route that holds live session work.
//!
//! [`NavigationGuard`] is the plain state machine. [`use_navigation_guard`]
//! wires it to the router so components get a [`GuardHandle`].

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use leptos::prelude::*;
use leptos_router::hooks::{use_location, use_navigate};
use leptos_router::NavigateOptions;
use wasm_bindgen_futures::spawn_local;

/// What to do with a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Go now.
    Navigate(String),
    /// Hold the destination and ask first.
    Prompt,
    /// Already there.
    Stay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationGuard {
    enabled: bool,
    pending: Option<String>,
    show_confirm: bool,
}

impl NavigationGuard {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    /// Disarming also drops any open prompt.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.cancel();
        }
    }

    pub fn request(&mut self, to: &str, current: &str) -> GuardDecision {
        if !self.enabled {
            return GuardDecision::Navigate(to.to_string());
        }
        if to == current {
            return GuardDecision::Stay;
        }
        self.pending = Some(to.to_string());
        self.show_confirm = true;
        GuardDecision::Prompt
    }

    /// Close the prompt and hand back the held destination.
    pub fn take_pending(&mut self) -> Option<String> {
        self.show_confirm = false;
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.show_confirm = false;
        self.pending = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn show_confirm(&self) -> bool {
        self.show_confirm
    }
}

type BeforeNavigate = Rc<dyn Fn() -> Pin<Box<dyn Future<Output = bool>>>>;

/// Hooks run around a confirmed or cancelled navigation.
#[derive(Clone, Default)]
pub struct GuardOptions {
    before_navigate: Option<BeforeNavigate>,
    on_confirm: Option<Rc<dyn Fn()>>,
    on_cancel: Option<Rc<dyn Fn()>>,
}

impl GuardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs after the user confirms. Returning false aborts the navigation.
    pub fn before_navigate<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = bool> + 'static,
    {
        self.before_navigate = Some(Rc::new(move || {
            Box::pin(check()) as Pin<Box<dyn Future<Output = bool>>>
        }));
        self
    }

    pub fn on_confirm(mut self, effect: impl Fn() + 'static) -> Self {
        self.on_confirm = Some(Rc::new(effect));
        self
    }

    pub fn on_cancel(mut self, effect: impl Fn() + 'static) -> Self {
        self.on_cancel = Some(Rc::new(effect));
        self
    }
}

#[derive(Clone, Copy)]
pub struct GuardHandle {
    state: RwSignal<NavigationGuard>,
    pathname: Memo<String>,
    options: StoredValue<GuardOptions, LocalStorage>,
    navigate: StoredValue<Rc<dyn Fn(&str)>, LocalStorage>,
}

impl GuardHandle {
    pub fn navigate_with_guard(&self, to: &str) -> GuardDecision {
        let current = self.pathname.get_untracked();
        let decision = self
            .state
            .try_update(|guard| guard.request(to, &current))
            .unwrap_or(GuardDecision::Stay);
        if let GuardDecision::Navigate(ref path) = decision {
            self.navigate_without_guard(path);
        }
        decision
    }

    pub fn navigate_without_guard(&self, to: &str) {
        self.navigate.with_value(|navigate| navigate(to));
    }

    pub fn confirm(&self) {
        let Some(to) = self
            .state
            .with_untracked(|guard| guard.pending().map(str::to_string))
        else {
            return;
        };

        let handle = *self;
        spawn_local(async move {
            let check = handle.options.with_value(|o| o.before_navigate.clone());
            let proceed = match check {
                Some(check) => check().await,
                None => true,
            };
            handle.state.update(|guard| {
                guard.take_pending();
            });
            if !proceed {
                return;
            }
            if let Some(effect) = handle.options.with_value(|o| o.on_confirm.clone()) {
                effect();
            }
            handle.navigate_without_guard(&to);
        });
    }

    pub fn cancel(&self) {
        self.state.update(NavigationGuard::cancel);
        if let Some(effect) = self.options.with_value(|o| o.on_cancel.clone()) {
            effect();
        }
    }

    pub fn show_confirm(&self) -> bool {
        self.state.with(NavigationGuard::show_confirm)
    }
}

/// Guard in-app navigation while `enabled` holds. Must be called under the
/// router.
pub fn use_navigation_guard(enabled: Signal<bool>, options: GuardOptions) -> GuardHandle {
    let state = RwSignal::new(NavigationGuard::new(enabled.get_untracked()));
    let location = use_location();
    let navigate = use_navigate();

    Effect::new(move |_| {
        let armed = enabled.get();
        state.update(|guard| guard.set_enabled(armed));
    });

    let navigate: Rc<dyn Fn(&str)> =
        Rc::new(move |to: &str| navigate(to, NavigateOptions::default()));

    GuardHandle {
        state,
        pathname: location.pathname,
        options: StoredValue::new_local(options),
        navigate: StoredValue::new_local(navigate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disarmed_guard_navigates_immediately() {
        let mut guard = NavigationGuard::new(false);
        assert_eq!(
            guard.request("/", "/dashboard"),
            GuardDecision::Navigate("/".to_string())
        );
        assert!(!guard.show_confirm());
        assert_eq!(guard.pending(), None);
    }

    #[test]
    fn test_armed_guard_holds_destination() {
        let mut guard = NavigationGuard::new(true);
        assert_eq!(guard.request("/", "/dashboard"), GuardDecision::Prompt);
        assert!(guard.show_confirm());
        assert_eq!(guard.pending(), Some("/"));

        assert_eq!(guard.take_pending(), Some("/".to_string()));
        assert!(!guard.show_confirm());
        assert_eq!(guard.pending(), None);
    }

    #[test]
    fn test_same_route_is_a_no_op() {
        let mut guard = NavigationGuard::new(true);
        assert_eq!(guard.request("/dashboard", "/dashboard"), GuardDecision::Stay);
        assert!(!guard.show_confirm());
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut guard = NavigationGuard::new(true);
        guard.request("/", "/dashboard");
        guard.cancel();
        assert!(!guard.show_confirm());
        assert_eq!(guard.take_pending(), None);
    }

    #[test]
    fn test_disarming_closes_prompt() {
        let mut guard = NavigationGuard::new(true);
        guard.request("/", "/dashboard");
        guard.set_enabled(false);
        assert!(!guard.is_enabled());
        assert!(!guard.show_confirm());
        assert_eq!(guard.pending(), None);
    }
}
