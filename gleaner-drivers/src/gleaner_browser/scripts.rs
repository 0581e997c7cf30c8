//! JavaScript executed inside fetched pages.
//!
//! Each script returns a small JSON value so the caller can log what changed.

/// Removes fixed/sticky overlays, consent banners, and open modal dialogs.
/// Returns the number of removed elements.
pub const REMOVE_OVERLAYS: &str = r#"
    const vw = window.innerWidth, vh = window.innerHeight;
    let removed = 0;
    for (const el of Array.from(document.querySelectorAll('body *'))) {
        if (!el.isConnected) continue;
        const style = window.getComputedStyle(el);
        if (style.position !== 'fixed' && style.position !== 'sticky') continue;
        const z = parseInt(style.zIndex, 10) || 0;
        const rect = el.getBoundingClientRect();
        const covers = rect.width >= vw * 0.5 && rect.height >= vh * 0.5;
        if (z >= 100 || covers) {
            el.remove();
            removed++;
        }
    }
    const banners = '[id*="cookie" i], [class*="cookie" i], [id*="consent" i], '
        + '[class*="consent" i], [aria-modal="true"], dialog[open]';
    for (const el of Array.from(document.querySelectorAll(banners))) {
        if (el.isConnected && el !== document.body) {
            el.remove();
            removed++;
        }
    }
    if (document.body) document.body.style.overflow = 'auto';
    return removed;
"#;

/// Replaces anchors pointing at another host with their text content.
/// Returns the number of unwrapped anchors.
pub const UNWRAP_EXTERNAL_LINKS: &str = r#"
    const bare = (h) => h.replace(/^www\./, '');
    const host = bare(location.hostname);
    let dropped = 0;
    for (const a of Array.from(document.querySelectorAll('a[href]'))) {
        let target;
        try { target = new URL(a.getAttribute('href'), location.href); } catch (_) { continue; }
        if (target.protocol !== 'http:' && target.protocol !== 'https:') continue;
        if (bare(target.hostname) !== host) {
            a.replaceWith(...Array.from(a.childNodes));
            dropped++;
        }
    }
    return dropped;
"#;

/// Inlines readable (same-origin) iframe bodies into the parent document.
/// Returns the number of inlined frames.
pub const INLINE_IFRAMES: &str = r#"
    let inlined = 0;
    for (const frame of Array.from(document.querySelectorAll('iframe'))) {
        try {
            const doc = frame.contentDocument;
            if (!doc || !doc.body) continue;
            const holder = document.createElement('div');
            holder.setAttribute('data-gleaner-iframe', frame.src || '');
            holder.innerHTML = doc.body.innerHTML;
            frame.replaceWith(holder);
            inlined++;
        } catch (_) {
            // cross-origin frames are left alone
        }
    }
    return inlined;
"#;

/// Visible text plus every absolute http(s) link on the page.
pub const SNAPSHOT: &str = r#"
    const links = Array.from(document.querySelectorAll('a[href]'))
        .map((a) => a.href)
        .filter((h) => h.startsWith('http://') || h.startsWith('https://'));
    return {
        text: document.body ? document.body.innerText : '',
        links: Array.from(new Set(links)),
    };
"#;
