use std::env;

use anyhow::{Result, anyhow};
use tracing::{instrument, warn};
use xcb::{
    Connection, Xid,
    screensaver::{QueryInfo, QueryInfoReply},
    x::{ATOM_ANY, Atom, Drawable, GetProperty, InternAtom, Window},
};

use super::{FocusMonitor, FocusSample};

fn get_active_window_atom(conn: &Connection) -> Result<Atom> {
    let active_window_atom = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name: b"_NET_ACTIVE_WINDOW",
    }))?;
    Ok(active_window_atom.atom())
}

fn get_active_window(conn: &Connection, root: &Window, active_window_atom: Atom) -> Result<Window> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: *root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    result
        .value::<Window>()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Root window carries no _NET_ACTIVE_WINDOW property"))
}

pub struct X11FocusMonitor {
    connection: Connection,
    preferred_screen: i32,
    active_window_atom: Atom,
    /// Resource id of the terminal window this process runs in, from the
    /// WINDOWID convention. Without it every active window counts as focused.
    own_window: Option<u32>,
}

impl X11FocusMonitor {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let active_window_atom = get_active_window_atom(&connection)?;
        let own_window = env::var("WINDOWID").ok().and_then(|v| v.parse::<u32>().ok());
        if own_window.is_none() {
            warn!("WINDOWID is not set, treating any active window as focused");
        }
        Ok(Self {
            connection,
            preferred_screen,
            active_window_atom,
            own_window,
        })
    }

    fn root(&self) -> Window {
        let setup = self.connection.get_setup();

        // Currently the application only supports 1 x11 screen.
        setup
            .roots()
            .nth(self.preferred_screen.max(0) as usize)
            .unwrap()
            .root()
    }
}

impl FocusMonitor for X11FocusMonitor {
    #[instrument(skip(self))]
    fn sample(&mut self) -> Result<FocusSample> {
        let root = self.root();

        let focused = match self.own_window {
            Some(own) => {
                let active = get_active_window(&self.connection, &root, self.active_window_atom)?;
                active.resource_id() == own
            }
            None => true,
        };

        let idle = self.connection.send_request(&QueryInfo {
            drawable: Drawable::Window(root),
        });
        let reply: QueryInfoReply = self.connection.wait_for_reply(idle)?;

        Ok(FocusSample {
            focused,
            idle_ms: reply.ms_since_user_input(),
        })
    }
}
