//! Page-level anti-detection patches
//!
//! Installed with `Page.addScriptToEvaluateOnNewDocument`, so it runs
//! before any site script on every navigation.

/// Script masking the most common automation fingerprints
pub const STEALTH_SCRIPT: &str = r#"
(() => {
    const define = (target, key, value) => {
        try {
            Object.defineProperty(target, key, { get: () => value, configurable: true });
        } catch (e) {}
    };

    // navigator.webdriver is the first thing bot checks look at
    define(Navigator.prototype, 'webdriver', undefined);
    define(navigator, 'languages', ['en-US', 'en']);
    define(navigator, 'plugins', [1, 2, 3, 4, 5]);
    define(navigator, 'vendor', 'Google Inc.');
    define(navigator, 'hardwareConcurrency', 8);

    window.chrome = window.chrome || {};
    if (!window.chrome.runtime) {
        window.chrome.runtime = {
            connect: () => ({ onDisconnect: { addListener() {} }, postMessage() {} }),
            sendMessage() {},
            onMessage: { addListener() {}, removeListener() {} },
        };
    }
    window.chrome.app = window.chrome.app || { isInstalled: false };

    const permissions = window.navigator.permissions;
    if (permissions && permissions.query) {
        const query = permissions.query.bind(permissions);
        permissions.query = (parameters) =>
            parameters && parameters.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : query(parameters);
    }

    const spoofRenderer = (proto) => {
        if (!proto) return;
        const getParameter = proto.getParameter;
        proto.getParameter = function (parameter) {
            if (parameter === 37445) return 'Intel Inc.';
            if (parameter === 37446) return 'Intel Iris OpenGL Engine';
            return getParameter.apply(this, arguments);
        };
    };
    spoofRenderer(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
    spoofRenderer(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);

    for (const marker of [
        '__playwright', '__puppeteer', '__selenium', '__webdriver_script_fn',
        'callPhantom', '_phantom', 'phantom', '__nightmare',
    ]) {
        try { delete window[marker]; } catch (e) {}
    }
    for (const marker of [
        '__selenium_unwrapped', '__webdriver_evaluate', '__driver_evaluate',
        '__webdriver_script_function', '__fxdriver_evaluate', '__driver_unwrapped',
    ]) {
        try { delete document[marker]; } catch (e) {}
    }
})();
"#;
