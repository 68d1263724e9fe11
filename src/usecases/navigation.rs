//! Navigation - Routes, Back Stack and Drawer Menu
//!
//! A small back-stack model of the app's screens. Front-ends render
//! whatever `Navigator::current` returns and call `navigate`/`back` in
//! response to user input.

/// A screen of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
  Login,
  Home,
  Conversion,
  History,
}

impl Route {
  /// Stable route name.
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Login => "login",
      Self::Home => "home",
      Self::Conversion => "conversion",
      Self::History => "history",
    }
  }

  /// Whether the screen needs a signed-in user.
  pub const fn requires_session(self) -> bool {
    !matches!(self, Self::Login)
  }
}

impl std::fmt::Display for Route {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What to pop before pushing a new route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopUpTo {
  /// Keep the back stack.
  Nothing,
  /// Pop entries up to and including the last occurrence of a route.
  Inclusive(Route),
  /// Clear the whole back stack.
  All,
}

/// Where the app starts.
pub const fn start_route(signed_in: bool) -> Route {
  if signed_in { Route::Home } else { Route::Login }
}

/// A drawer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
  pub title: &'static str,
  pub action: MenuAction,
}

/// What a drawer entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
  Open(Route),
  SignOut,
}

/// Drawer entries, in display order.
pub const DRAWER_ITEMS: [MenuItem; 4] = [
  MenuItem { title: "Home", action: MenuAction::Open(Route::Home) },
  MenuItem { title: "Converter", action: MenuAction::Open(Route::Conversion) },
  MenuItem { title: "History", action: MenuAction::Open(Route::History) },
  MenuItem { title: "Sign out", action: MenuAction::SignOut },
];

/// Back stack of visited routes. Never empty.
#[derive(Debug, Clone)]
pub struct Navigator {
  back_stack: Vec<Route>,
}

impl Navigator {
  /// Start at `route`.
  pub fn new(route: Route) -> Self {
    Self {
      back_stack: vec![route],
    }
  }

  /// The route on top of the stack.
  pub fn current(&self) -> Route {
    *self.back_stack.last().unwrap_or(&Route::Login)
  }

  /// Number of entries on the stack.
  pub fn depth(&self) -> usize {
    self.back_stack.len()
  }

  /// Pop according to `pop`, then push `route` unless it is already on top.
  pub fn navigate(&mut self, route: Route, pop: PopUpTo) {
    match pop {
      PopUpTo::Nothing => {}
      PopUpTo::Inclusive(target) => {
        if let Some(pos) = self.back_stack.iter().rposition(|r| *r == target) {
          self.back_stack.truncate(pos);
        }
      }
      PopUpTo::All => self.back_stack.clear(),
    }

    if self.back_stack.last() != Some(&route) {
      self.back_stack.push(route);
    }
  }

  /// Pop the current route. Returns false when already at the root.
  pub fn back(&mut self) -> bool {
    if self.back_stack.len() > 1 {
      self.back_stack.pop();
      true
    } else {
      false
    }
  }
}
