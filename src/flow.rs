//! Flow control and application event loop.
//!
//! A "flow" is a scene that handles user input, advances its simulation and
//! provides renderable objects each frame. [`run`] creates the window, the GPU
//! [`Context`] and the flows, then drives the winit event loop.
//!
//! # Lifecycle
//!
//! Startup goes through the [`Phase`]s `Pending`, `Loading` and then `Ready`
//! or `Failed`. Nothing is rendered before `Ready`. Each frame afterwards:
//! 1. `on_update` on every flow
//! 2. camera update
//! 3. the flows' `on_render` results are batched into the main pass
//! 4. post-processing writes the frame to the surface
//! 5. `on_overlay` draws on top of the finished frame
//! 6. present and request the next redraw

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::{Context, InitContext, MouseButtonState},
    render::{Instanced, Render, draw_instanced},
};

/// A renderable scene.
///
/// The engine passes input to every flow, updates them once per frame and
/// composes their renders.
pub trait GraphicsFlow {
    /// Called once after every flow was constructed, before the first frame.
    ///
    /// This is the place to adjust the context, e.g. the clear colour.
    fn on_init(&mut self, ctx: &mut Context);

    /// Advance the flow by `dt`.
    fn on_update(&mut self, ctx: &Context, dt: Duration);

    /// Handle window events (keyboard, mouse, resizing).
    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent);

    /// Handle raw device events.
    fn on_device_events(&mut self, _ctx: &Context, _event: &DeviceEvent) {}

    /// Opaque geometry of this flow for the main pass.
    fn on_render(&self) -> Render<'_>;

    /// Draw directly onto the post-processed frame.
    fn on_overlay(
        &mut self,
        _ctx: &Context,
        _encoder: &mut wgpu::CommandEncoder,
        _view: &wgpu::TextureView,
    ) {
    }
}

impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Async factory of a flow. Constructors of all flows run concurrently.
pub type FlowConstructor = Box<
    dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow>>>>>,
>;

/// Startup progress of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the window.
    Pending,
    /// Context and flows are being created.
    Loading,
    /// Rendering.
    Ready,
    /// Startup failed, the event loop is shutting down.
    Failed,
}

impl Phase {
    pub fn resumed(self) -> Self {
        match self {
            Phase::Pending => Phase::Loading,
            other => other,
        }
    }

    pub fn loaded(self, ok: bool) -> Self {
        match (self, ok) {
            (Phase::Loading, true) => Phase::Ready,
            (Phase::Loading, false) => Phase::Failed,
            (other, _) => other,
        }
    }

    pub fn renders(self) -> bool {
        self == Phase::Ready
    }
}

#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
}

impl AppState {
    fn render(
        &mut self,
        graphics_flows: &mut [Box<dyn GraphicsFlow>],
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = self
                .ctx
                .post_process
                .begin_scene_pass(&mut encoder, self.ctx.clear_colour);
            render_pass.set_pipeline(&self.ctx.basic_pipeline);

            let mut basics: Vec<Instanced> = Vec::new();
            graphics_flows
                .iter()
                .for_each(|flow| flow.on_render().collect(&mut basics));
            draw_instanced(
                &mut render_pass,
                &basics,
                &self.ctx.camera.bind_group,
                &self.ctx.light.bind_group,
            );
        }
        self.ctx.post_process.run(&mut encoder, &view);
        graphics_flows
            .iter_mut()
            .for_each(|flow| flow.on_overlay(&self.ctx, &mut encoder, &view));

        self.ctx.queue.submit(iter::once(encoder.finish()));
        self.ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

// Only constructed by the wasm startup task.
#[allow(dead_code)]
pub(crate) enum FlowEvent {
    Initialized {
        state: AppState,
        flows: Vec<Box<dyn GraphicsFlow>>,
    },
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: EventLoopProxy<FlowEvent>,
    config: SceneConfig,
    phase: Phase,
    state: Option<AppState>,
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // Taken once the window exists.
    constructors: Option<Vec<FlowConstructor>>,
    error: Option<anyhow::Error>,
    last_time: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: SceneConfig,
        constructors: Vec<FlowConstructor>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            phase: Phase::Pending,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            error: None,
            last_time: Instant::now(),
        })
    }

    fn start(&mut self, mut state: AppState, flows: Vec<Box<dyn GraphicsFlow>>) {
        self.graphics_flows = flows;
        state.ctx.reconfigure();
        self.graphics_flows
            .iter_mut()
            .for_each(|flow| flow.on_init(&mut state.ctx));
        self.phase = self.phase.loaded(true);
        log::info!("scene ready with {} flow(s)", self.graphics_flows.len());
        state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(state);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("scene initialization failed: {error:#}");
        self.phase = Phase::Failed;
        self.error = Some(error);
        event_loop.exit();
    }

    fn window_attributes(&self) -> anyhow::Result<winit::window::WindowAttributes> {
        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.window_title.as_str());

        #[cfg(target_arch = "wasm32")]
        {
            use anyhow::Context as _;
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&self.config.canvas_id))
                .with_context(|| format!("no element with id '{}'", self.config.canvas_id))?;
            let html_canvas_element = canvas
                .dyn_into::<web_sys::HtmlCanvasElement>()
                .map_err(|_| anyhow::anyhow!("'{}' is not a canvas", self.config.canvas_id))?;
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        Ok(window_attributes)
    }

    fn frame(&mut self) {
        let state = match &mut self.state {
            Some(state) if self.phase.renders() => state,
            _ => return,
        };
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();

        self.graphics_flows
            .iter_mut()
            .for_each(|f| f.on_update(&state.ctx, dt));
        let ctx = &mut state.ctx;
        ctx.camera.controller.update(&mut ctx.camera.camera, dt);
        ctx.camera.write(&ctx.queue, &ctx.projection);

        match state.render(&mut self.graphics_flows) {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                state.ctx.reconfigure();
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
            }
        }
        state.ctx.window.request_redraw();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.phase != Phase::Pending {
            return;
        }
        let window = match self
            .window_attributes()
            .and_then(|attributes| Ok(event_loop.create_window(attributes)?))
        {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e),
        };
        self.phase = self.phase.resumed();

        let constructors = self.constructors.take().unwrap_or_default();
        let config = self.config.clone();
        let init_future = async move {
            let ctx = Context::new(window, config).await?;
            // The clone in into() only clones the internal Arcs of Device and Queue
            let flows = futures::future::try_join_all(
                constructors
                    .into_iter()
                    .map(|constructor| constructor((&ctx).into())),
            )
            .await?;
            anyhow::Ok((AppState { ctx }, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        match self.async_runtime.block_on(init_future) {
            Ok((state, flows)) => self.start(state, flows),
            Err(e) => self.fail(event_loop, e),
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("the event loop closed before the scene was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized { state, flows } => self.start(state, flows),
            FlowEvent::Failed(e) => self.fail(event_loop, e),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.ctx.mouse.is_dragging() {
                state.ctx.camera.controller.handle_mouse(dx, dy);
            }
        }
        self.graphics_flows
            .iter_mut()
            .for_each(|f| f.on_device_events(&state.ctx, &event));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            event_loop.exit();
            return;
        }
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.ctx.camera.controller.handle_window_events(&event);
        match &event {
            WindowEvent::CursorMoved { position, .. } => state.ctx.mouse.coords = *position,
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                state.ctx.mouse.pressed = match (button, button_state.is_pressed()) {
                    (MouseButton::Left, true) => MouseButtonState::Left,
                    (MouseButton::Right, true) => MouseButtonState::Right,
                    (_, true) => state.ctx.mouse.pressed,
                    (_, false) => MouseButtonState::None,
                };
            }
            _ => {}
        }

        self.graphics_flows
            .iter_mut()
            .for_each(|f| f.on_window_events(&state.ctx, &event));

        match event {
            WindowEvent::Resized(size) => state.ctx.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.frame(),
            _ => {}
        }
    }
}

/// Install logging, open the window and run the flows until the window closes.
///
/// Returns the first error raised while creating the context or any flow.
pub fn run(config: SceneConfig, constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        if let Err(e) = env_logger::Builder::from_env(env).try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("could not initialize logger: {e}").into());
        }
    }

    log::info!("starting in {:?} mode", config.mode);
    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, constructors)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
