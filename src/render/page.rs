use super::escape;
use crate::classify::ViewState;
use crate::types::AttributeName;
use strum::IntoEnumIterator;

pub fn render_page(map_svg: &str, chart_svg: &str, view: &ViewState, interactive: bool) -> String {
    let script = if interactive {
        format!("<script>{}</script>", inline_javascript())
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>New Jersey Residents by Age</title>
    <style>{css}</style>
</head>
<body>
{map}{chart}{dropdown}
{script}
</body>
</html>
"#,
        css = inline_css(),
        map = map_svg,
        chart = chart_svg,
        dropdown = render_dropdown(view.expressed),
        script = script,
    )
}

fn render_dropdown(expressed: AttributeName) -> String {
    let options: String = AttributeName::iter()
        .map(|attr| {
            let label = escape(&attr.to_string());
            let selected = if attr == expressed { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, label, selected)
        })
        .collect();
    format!(r#"<select class="dropdown">{}</select>"#, options)
}

fn inline_css() -> &'static str {
    r#"
body { font-family: sans-serif; }
.map, .chart { display: inline-block; margin: 10px 0 0 1%; }
.gratLines { fill: none; stroke: #999; stroke-width: 0.5px; }
.states { fill: #eee; stroke: #999; stroke-width: 0.5px; }
.counties { stroke-linejoin: round; }
.chartBackground { fill: #fff; }
.chartFrame { fill: none; stroke: #000; stroke-width: 2px; }
.chartTitle { font-size: 1.2em; font-weight: bold; }
.axis path, .axis line { fill: none; stroke: #000; shape-rendering: crispEdges; }
.axis text { font-size: 0.8em; }
.dropdown { position: absolute; top: 30px; left: 30px; z-index: 10; font-size: 1em; }
.infolabel { position: absolute; min-width: 160px; padding: 4px 8px; background: rgba(255, 255, 255, 0.9);
    border: solid thin #ccc; border-radius: 4px; box-shadow: 2px 2px 4px #999; pointer-events: none; }
.infolabel h1 { margin: 0; font-size: 1.4em; }
.countyName { font-size: 1em; }
"#
}

fn inline_javascript() -> &'static str {
    r#"
(function () {
    let queue = Promise.resolve();
    let moving = false;

    function post(event) {
        queue = queue
            .then(() => fetch('/api/event', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(event),
            }))
            .then((res) => res.json())
            .then(apply)
            .catch((err) => console.error(err));
        return queue;
    }

    // Several paths may share one GEOID; every command targets all of them.
    function findAll(kind, geoid) {
        const cls = kind === 'county' ? '.counties' : '.bar';
        return document.querySelectorAll(cls + '[data-geoid="' + CSS.escape(geoid) + '"]');
    }

    function apply(commands) {
        for (const c of commands) {
            switch (c.op) {
            case 'set_stroke':
                findAll(c.element.kind, c.element.geoid).forEach((el) => {
                    el.style.stroke = c.stroke;
                    el.style.strokeWidth = c.stroke_width;
                });
                break;
            case 'show_label': {
                const label = document.createElement('div');
                label.className = 'infolabel';
                label.id = c.geoid + '_label';
                const h1 = document.createElement('h1');
                h1.textContent = c.heading;
                const b = document.createElement('b');
                b.textContent = c.attribute;
                const name = document.createElement('div');
                name.className = 'countyName';
                name.textContent = c.county_name;
                label.append(h1, b, name);
                document.body.appendChild(label);
                break;
            }
            case 'move_label': {
                const label = document.querySelector('.infolabel');
                if (label) { label.style.left = c.left + 'px'; label.style.top = c.top + 'px'; }
                break;
            }
            case 'remove_label':
                document.querySelectorAll('.infolabel').forEach((el) => el.remove());
                break;
            case 'recolor':
                findAll(c.element.kind, c.element.geoid).forEach((el) => {
                    el.style.transition = 'fill ' + c.duration_ms + 'ms';
                    el.style.fill = c.fill;
                });
                break;
            case 'place_bar':
                findAll('bar', c.geoid).forEach((el) => {
                    el.style.transition = 'all ' + c.duration_ms + 'ms ease ' + c.delay_ms + 'ms';
                    el.setAttribute('x', c.x);
                    el.setAttribute('y', c.y);
                    el.setAttribute('width', c.width);
                    el.setAttribute('height', c.height);
                    el.style.fill = c.fill;
                });
                break;
            case 'set_title':
                document.querySelector('.chartTitle').textContent = c.text;
                break;
            }
        }
    }

    document.querySelectorAll('.counties, .bar').forEach((el) => {
        const geoid = el.dataset.geoid;
        el.addEventListener('mouseover', () => post({ type: 'pointer_enter', geoid }));
        el.addEventListener('mouseout', () => post({ type: 'pointer_leave', geoid }));
        el.addEventListener('mousemove', (e) => {
            const label = document.querySelector('.infolabel');
            if (moving || !label) return;
            moving = true;
            post({
                type: 'pointer_move',
                client_x: e.clientX,
                client_y: e.clientY,
                viewport_width: window.innerWidth,
                label_width: label.getBoundingClientRect().width,
            }).finally(() => { moving = false; });
        });
    });

    document.querySelector('.dropdown').addEventListener('change', (e) => {
        post({ type: 'select_attribute', attribute: e.target.value });
    });
})();
"#
}
