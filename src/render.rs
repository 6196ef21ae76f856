//! HTML pages and fragments of the dashboard, built on [`crate::view`].
//!
//! Record ids and endpoints travel in `data-*` attributes; the embedded
//! script reads them back, so no markup ever interpolates data into code.

use chrono::Utc;

use crate::approval::ApprovalQueue;
use crate::board::CommissionBoard;
use crate::filters::{DateRange, FilterPanel, MultiSelect};
use crate::format::{
    fix_name_spacing, format_currency, format_currency_or_zero, format_date, format_decimal,
    yes_no, yes_no_upper, PLACEHOLDER,
};
use crate::lookup::{ContractOption, LotSuggestion};
use crate::models::{
    Broker, BrokerAccount, BrokerContract, Commission, CommissionRule, ContractInfo, EmailConfig,
    Enterprise, RuleKind, SyncLog, User,
};
use crate::report::CommissionReport;
use crate::selection::Selection;
use crate::settings::SettingsSnapshot;
use crate::status::{translate_installment_status, Badge};
use crate::ui::Notice;
use crate::view::{el, Element, Node};

pub const COMMISSION_HEADERS: [&str; 11] = [
    "",
    "Status Parcela",
    "Corretor",
    "Empreendimento",
    "Unidade",
    "Cliente",
    "Valor Comissão",
    "Valor Gatilho",
    "Atingiu Gatilho",
    "Status Aprovação",
    "Observação",
];

pub const APPROVAL_HEADERS: [&str; 9] = [
    "",
    "Corretor",
    "Empreendimento",
    "Unidade",
    "Cliente",
    "Valor Comissão",
    "Data Comissão",
    "Atingiu Gatilho",
    "Enviado em",
];

pub const REPORT_HEADERS: [&str; 10] = [
    "Corretor",
    "Empreendimento",
    "Unidade",
    "Cliente",
    "Valor Comissão",
    "Valor Pago",
    "Atingiu Gatilho",
    "Status Parcela",
    "Status Aprovação",
    "Data Comissão",
];

pub const SUBMIT_ENDPOINT: &str = "/dashboard/comissoes/enviar";
pub const APPROVE_ENDPOINT: &str = "/dashboard/direcao/aprovar";
pub const REJECT_ENDPOINT: &str = "/dashboard/direcao/rejeitar";
pub const SYNC_ENDPOINT: &str = "/dashboard/sincronizar";
pub const USERS_ENDPOINT: &str = "/dashboard/usuarios";
pub const RULES_ENDPOINT: &str = "/dashboard/regras";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Comissoes,
    Relatorio,
    Contratos,
    Corretores,
    Direcao,
    Configuracoes,
}

const NAV_LINKS: [(Nav, &str, &str); 6] = [
    (Nav::Comissoes, "/dashboard", "Comissões"),
    (Nav::Relatorio, "/dashboard/relatorio", "Relatório"),
    (Nav::Contratos, "/dashboard/contratos", "Contratos"),
    (Nav::Corretores, "/dashboard/corretores", "Corretores"),
    (Nav::Direcao, "/dashboard/direcao", "Direção"),
    (Nav::Configuracoes, "/dashboard/configuracoes", "Configurações"),
];

const STYLE: &str = "<style>:root{--bg:#f5f1e7;--bg2:#e9f0f2;--card:#ffffff;--ink:#182026;--muted:#5f6a73;--line:#d7dce1;--head:#14343f;--btn:#0c5f78;--btnhover:#094d61;--attention:#fff5b8}*{box-sizing:border-box}body{margin:0;color:var(--ink);font-family:\"Avenir Next\",\"Segoe UI\",sans-serif;background:linear-gradient(160deg,var(--bg),var(--bg2));min-height:100vh}.shell{max-width:1500px;margin:0 auto;padding:24px 18px 28px}nav{display:flex;gap:8px;margin-bottom:14px;flex-wrap:wrap}nav a{padding:7px 12px;border-radius:9px;color:var(--head);text-decoration:none;font-weight:600}nav a.active{background:var(--head);color:#f7fbfc}.hero{background:linear-gradient(135deg,#102f3a 0%,#24576b 100%);color:#f7fbfc;border-radius:16px;padding:18px 20px}.hero h1{margin:0 0 8px;font-size:1.6rem}.hero-meta{display:flex;gap:16px;flex-wrap:wrap;font-size:.92rem;color:#dcebf0}.card{margin-top:16px;background:var(--card);border:1px solid #cbd4db;border-radius:16px;overflow:hidden;padding:0 0 4px}.card h2{margin:0;padding:12px 14px;font-size:1.05rem;border-bottom:1px solid var(--line)}.table-wrap{overflow:auto;max-height:75vh}table{width:100%;border-collapse:collapse}thead th{position:sticky;top:0;background:var(--head);color:#f2f7f9;font-size:.8rem;text-transform:uppercase;letter-spacing:.04em;padding:10px;text-align:left}tbody td{font-size:.84rem;padding:9px 10px;border-bottom:1px solid var(--line);white-space:nowrap}tr.highlight-pendente-gatilho{background:var(--attention)}.badge-status{display:inline-block;padding:3px 8px;border-radius:999px;font-size:.74rem;font-weight:700}.badge-success{background:#d6f5df;color:#17623a}.badge-danger{background:#fadcdc;color:#8a1f1f}.badge-warning{background:#fff0c2;color:#7a5a00}.badge-info{background:#d9ecf7;color:#1b5874}.badge-secondary{background:#e6e9ec;color:#4a545c}.gatilho-sim{color:#17623a;font-weight:700}.gatilho-nao{color:#8a1f1f;font-weight:700}.alert{margin-top:14px;padding:10px 14px;border-radius:10px}.alert-success{background:#d6f5df}.alert-info{background:#d9ecf7}.alert-warning{background:#fff0c2}.alert-error{background:#fadcdc}.filters{display:flex;gap:12px;flex-wrap:wrap;align-items:flex-start;padding:12px 14px}.filter-group{border:1px solid var(--line);border-radius:10px;padding:6px 10px;min-width:180px}.filter-group summary{cursor:pointer;display:flex;justify-content:space-between;gap:8px}.filter-summary{color:var(--muted)}.filter-options label{display:block;padding:2px 0}.btn{background:var(--btn);color:#fff;border:0;border-radius:9px;padding:8px 12px;font-weight:700;cursor:pointer;text-decoration:none}.btn:hover{background:var(--btnhover)}.btn-danger{background:#a33}.btn-ghost{background:transparent;color:var(--btn);border:1px solid var(--btn)}.batch-actions{display:flex;gap:10px;align-items:center;padding:12px 14px}.info-grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(200px,1fr));gap:10px;padding:12px 14px}.info-label{font-size:.74rem;color:var(--muted);text-transform:uppercase}.info-value{font-weight:600}.autocomplete-item{display:block;padding:8px 14px;border-bottom:1px solid var(--line);color:inherit;text-decoration:none}.email-tag{display:inline-block;margin:2px;padding:2px 8px;border-radius:999px;background:#e9f0f2}.section-error,.empty{padding:12px 14px;color:var(--muted)}dialog{border:0;border-radius:14px;padding:18px;min-width:340px}dialog textarea,.batch-actions textarea{width:100%;min-height:70px}@media (max-width:760px){.shell{padding:12px}.hero h1{font-size:1.28rem}}</style>";

const SCRIPT: &str = "<script>(function(){\
function checked(){return Array.from(document.querySelectorAll('input.row-check:checked'));}\
function ids(){return checked().map(function(box){return Number(box.dataset.id);});}\
function refresh(){var n=ids().length;document.querySelectorAll('[data-selected-count]').forEach(function(node){node.textContent=String(n);});\
var total=checked().reduce(function(sum,box){return sum+Number(box.dataset.valor||0);},0);\
document.querySelectorAll('[data-selected-value]').forEach(function(node){node.textContent=total.toLocaleString('pt-BR',{style:'currency',currency:'BRL'});});}\
function flash(level,message){var box=document.getElementById('flash');if(!box){alert(message);return;}box.className='alert alert-'+level;box.textContent=message;box.hidden=false;}\
function payload(kind){var body={comissoes_ids:ids()};\
if(kind==='submit'){body.observacoes={};document.querySelectorAll('input.row-obs').forEach(function(input){if(input.value.trim()&&body.comissoes_ids.indexOf(Number(input.dataset.id))>=0){body.observacoes[input.dataset.id]=input.value.trim();}});}\
if(kind==='approve'){var note=document.getElementById('observacoes-aprovacao');if(note&&note.value.trim()){body.observacoes=note.value.trim();}}\
if(kind==='reject'){var reason=document.getElementById('motivo-rejeicao');body.motivo=reason?reason.value:'';}\
return body;}\
function fields(form){var body={};Array.from(form.elements).forEach(function(field){if(!field.name){return;}\
if(field.type==='checkbox'){body[field.name]=field.checked;}else if(field.type==='number'){body[field.name]=field.value===''?null:Number(field.value);}else{body[field.name]=field.value;}});return body;}\
function send(endpoint,method,body,button){if(button){button.disabled=true;}\
fetch(endpoint,{method:method,headers:{'Content-Type':'application/json'},body:JSON.stringify(body)})\
.then(function(response){return response.json().then(function(data){return {ok:response.ok,data:data};});})\
.then(function(result){if(result.ok){flash('success',result.data.mensagem);setTimeout(function(){window.location.reload();},800);}else{flash('error',result.data.erro);if(button){button.disabled=false;}}})\
.catch(function(){flash('error','Erro de conexão');if(button){button.disabled=false;}});}\
document.addEventListener('change',function(event){var target=event.target;\
if(target.matches('[data-select-all]')){document.querySelectorAll('input.row-check').forEach(function(box){box.checked=target.checked;});}\
if(target.matches('[data-select-all],input.row-check')){refresh();}\
if(target.matches('[data-autosubmit]')&&target.form){target.form.submit();}});\
document.addEventListener('click',function(event){var target=event.target.closest('button[data-endpoint],[data-open-dialog],[data-close-dialog]');if(!target){return;}\
if(target.dataset.openDialog){if(!ids().length){flash('error','Selecione ao menos uma comissão');return;}document.getElementById(target.dataset.openDialog).showModal();return;}\
if(target.dataset.closeDialog){document.getElementById(target.dataset.closeDialog).close();return;}\
var kind=target.dataset.payload;var bare=kind==='sync'||kind==='none';var body=bare?{}:payload(kind);\
if(!bare&&!body.comissoes_ids.length){flash('error','Selecione ao menos uma comissão');return;}\
if(kind==='reject'&&!body.motivo.trim()){flash('error','Informe o motivo da rejeição');return;}\
var prompt=target.dataset.confirm;if(prompt&&!confirm(prompt.replace('{n}',String(bare?0:body.comissoes_ids.length)))){return;}\
send(target.dataset.endpoint,target.dataset.method||'POST',body,target);});\
document.addEventListener('submit',function(event){var form=event.target;if(!form.dataset.endpoint){return;}event.preventDefault();\
var prompt=form.dataset.confirm;if(prompt&&!confirm(prompt)){return;}\
send(form.dataset.endpoint,form.dataset.method||'POST',fields(form),form.querySelector('button[type=submit]'));});\
refresh();\
var lot=document.querySelector('[data-lot-search]');var results=document.getElementById('resultados-lote');var timer=null;var seq=0;\
if(lot&&results){lot.addEventListener('input',function(){clearTimeout(timer);var query=lot.value.trim();seq++;if(query.length<2){results.innerHTML='';return;}\
timer=setTimeout(function(){var mine=seq;fetch(lot.dataset.lotSearch+'?lote='+encodeURIComponent(query)).then(function(response){return response.text();}).then(function(html){if(mine===seq){results.innerHTML=html;}});},300);});}\
})();</script>";

/// Full document with navigation, flash area, stylesheet and script.
pub fn document(title: &str, active: Nav, notice: Option<&Notice>, body: Vec<Node>) -> String {
    let nav = el("nav").children(NAV_LINKS.iter().map(|(nav, href, label)| {
        el("a")
            .attr("href", *href)
            .class(if *nav == active { "active" } else { "" })
            .text(*label)
            .into()
    }));

    let shell = el("main")
        .class("shell")
        .child(nav)
        .child(flash(notice))
        .children(body);

    let mut out = String::from("<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&el("title").text(title).render());
    out.push_str(STYLE);
    out.push_str("</head><body>\n");
    out.push_str(&shell.render());
    out.push_str(SCRIPT);
    out.push_str("</body></html>\n");
    out
}

fn flash(notice: Option<&Notice>) -> Element {
    match notice {
        Some(notice) => el("div")
            .id("flash")
            .class(format!("alert {}", notice.level.css_class()))
            .attr("role", "alert")
            .text(notice.message.clone()),
        None => el("div").id("flash").class("alert").flag("hidden", true),
    }
}

pub fn badge(kind: Badge, label: impl Into<String>) -> Node {
    el("span")
        .class(format!("badge-status {}", kind.css_class()))
        .text(label)
        .into()
}

fn hero(title: &str, meta: Vec<String>) -> Node {
    let generated = Utc::now().format("%d/%m/%Y %H:%M UTC").to_string();
    el("section")
        .class("hero")
        .child(el("h1").text(title))
        .child(
            el("div")
                .class("hero-meta")
                .children(meta.into_iter().map(|item| el("span").text(item).into()))
                .child(el("span").text(format!("Atualizado: {generated}"))),
        )
        .into()
}

fn card(title: &str, content: impl IntoIterator<Item = Node>) -> Node {
    el("section")
        .class("card")
        .child(el("h2").text(title))
        .children(content)
        .into()
}

fn table(id: &str, headers: Vec<Node>, rows: Vec<Node>) -> Node {
    el("div")
        .class("table-wrap")
        .child(
            el("table")
                .id(id)
                .child(el("thead").child(el("tr").children(headers)))
                .child(el("tbody").children(rows)),
        )
        .into()
}

fn header_cells(headers: &[&str]) -> Vec<Node> {
    headers.iter().map(|header| el("th").text(*header).into()).collect()
}

fn empty_row(columns: usize, message: &str) -> Node {
    el("tr")
        .child(
            el("td")
                .attr("colspan", columns.to_string())
                .class("empty")
                .text(message),
        )
        .into()
}

fn or_dash(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

fn trigger_cell(reached: bool) -> Node {
    el("td")
        .class(if reached { "gatilho-sim" } else { "gatilho-nao" })
        .text(yes_no_upper(reached))
        .into()
}

fn select_all_header() -> Node {
    el("th")
        .child(
            el("input")
                .attr("type", "checkbox")
                .attr("data-select-all", "")
                .attr("aria-label", "Selecionar todas"),
        )
        .into()
}

fn row_checkbox(row: &Commission, selection: &Selection) -> Element {
    el("input")
        .attr("type", "checkbox")
        .class("row-check")
        .attr("data-id", row.id.to_string())
        .attr("data-valor", row.commission_value.unwrap_or(0.0).to_string())
        .flag("checked", selection.contains(row.id))
}

/// One collapsible checkbox group; the summary shows what is selected.
pub fn filter_group(group: &MultiSelect, open: bool) -> Node {
    let options = group.options().iter().map(|option| {
        el("label")
            .child(
                el("input")
                    .attr("type", "checkbox")
                    .attr("name", group.name())
                    .attr("value", option.value.clone())
                    .flag("checked", group.is_selected(&option.value)),
            )
            .text(format!(" {}", option.label))
            .into()
    });

    el("details")
        .class("filter-group")
        .attr("data-filter", group.name())
        .flag("open", open)
        .child(
            el("summary")
                .child(el("span").class("filter-label").text(group.label()))
                .child(el("span").class("filter-summary").text(group.summary())),
        )
        .child(el("div").class("filter-options").children(options))
        .into()
}

fn date_input(name: &'static str, label: &str, value: Option<chrono::NaiveDate>) -> Node {
    el("label")
        .text(format!("{label} "))
        .child(
            el("input")
                .attr("type", "date")
                .attr("name", name)
                .attr(
                    "value",
                    value
                        .map(|day| day.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                ),
        )
        .into()
}

/// GET form of the commission listing; the export link reuses its query.
pub fn commission_filters(panel: &FilterPanel, period: DateRange, export_query: &str) -> Node {
    filter_form("/dashboard", "/dashboard/comissoes.csv", panel, period, export_query)
}

pub fn report_filters(panel: &FilterPanel, period: DateRange, export_query: &str) -> Node {
    filter_form(
        "/dashboard/relatorio",
        "/dashboard/relatorio.csv",
        panel,
        period,
        export_query,
    )
}

fn filter_form(
    action: &str,
    export_path: &str,
    panel: &FilterPanel,
    period: DateRange,
    export_query: &str,
) -> Node {
    let export_href = if export_query.is_empty() {
        export_path.to_string()
    } else {
        format!("{export_path}?{export_query}")
    };

    el("form")
        .class("filters")
        .attr("method", "get")
        .attr("action", action)
        .children(
            panel
                .groups()
                .iter()
                .map(|group| filter_group(group, panel.is_open(group.name()))),
        )
        .child(date_input("data_inicio", "De", period.start))
        .child(date_input("data_fim", "Até", period.end))
        .child(el("button").attr("type", "submit").class("btn").text("Filtrar"))
        .child(
            el("a")
                .class("btn btn-ghost")
                .attr("href", action)
                .text("Limpar filtros"),
        )
        .child(
            el("a")
                .class("btn btn-ghost")
                .attr("href", export_href)
                .text("Exportar CSV"),
        )
        .into()
}

pub fn commission_table(rows: &[Commission], selection: &Selection) -> Node {
    let mut headers = vec![select_all_header()];
    headers.extend(header_cells(&COMMISSION_HEADERS[1..]));

    let body = if rows.is_empty() {
        vec![empty_row(COMMISSION_HEADERS.len(), "Nenhuma comissão encontrada")]
    } else {
        rows.iter().map(|row| commission_row(row, selection)).collect()
    };

    table("tabela-comissoes", headers, body)
}

fn commission_row(row: &Commission, selection: &Selection) -> Node {
    let pending = row.is_submittable();
    let installment = row.installment_status();
    let approval = row.approval_status();

    let (check, observation) = if pending {
        (
            el("td").child(row_checkbox(row, selection)),
            el("td").child(
                el("input")
                    .attr("type", "text")
                    .class("row-obs")
                    .attr("data-id", row.id.to_string())
                    .attr("placeholder", "Observação")
                    .attr("value", selection.observation(row.id).unwrap_or_default()),
            ),
        )
    } else {
        (el("td"), el("td"))
    };

    el("tr")
        .attr("data-id", row.id.to_string())
        .class(if row.needs_attention() {
            "highlight-pendente-gatilho"
        } else {
            ""
        })
        .child(check)
        .child(el("td").child(badge(installment.badge(), installment.label())))
        .child(el("td").text(fix_name_spacing(row.broker_nome.as_deref())))
        .child(el("td").text(or_dash(row.enterprise_name.as_deref())))
        .child(el("td").text(or_dash(row.unit_name.as_deref())))
        .child(el("td").text(fix_name_spacing(row.customer_name.as_deref())))
        .child(el("td").text(format_currency(row.commission_value)))
        .child(el("td").text(format_currency(row.valor_gatilho)))
        .child(trigger_cell(row.atingiu_gatilho))
        .child(el("td").child(badge(approval.badge(), approval.label())))
        .child(observation)
        .into()
}

pub fn commission_page(board: &CommissionBoard, notice: Option<&Notice>) -> String {
    let query = form_query(&board.query().to_pairs());
    let body = vec![
        hero(
            "Comissões",
            vec![
                format!("Registros: {}", board.rows().len()),
                format!("Pendentes com gatilho: {}", board.attention_count()),
            ],
        ),
        card(
            "Filtros",
            [commission_filters(board.filters(), board.period(), &query)],
        ),
        card(
            "Comissões",
            [
                commission_table(board.rows(), board.selection()),
                el("div")
                    .class("batch-actions")
                    .child(el("span").attr("data-selected-count", "").text("0"))
                    .child(el("span").text(" selecionada(s)"))
                    .child(
                        el("button")
                            .class("btn")
                            .attr("type", "button")
                            .attr("data-endpoint", SUBMIT_ENDPOINT)
                            .attr("data-payload", "submit")
                            .attr(
                                "data-confirm",
                                "Enviar {n} comissão(ões) para aprovação da direção?",
                            )
                            .text("Enviar para aprovação"),
                    )
                    .into(),
            ],
        ),
    ];

    document("Comissões", Nav::Comissoes, notice, body)
}

pub fn report_table(rows: &[Commission]) -> Node {
    let body = if rows.is_empty() {
        vec![empty_row(REPORT_HEADERS.len(), "Nenhuma comissão encontrada")]
    } else {
        rows.iter()
            .map(|row| {
                let installment = row.installment_status();
                let approval = row.approval_status();
                el("tr")
                    .attr("data-id", row.id.to_string())
                    .child(el("td").text(fix_name_spacing(row.broker_nome.as_deref())))
                    .child(el("td").text(or_dash(row.enterprise_name.as_deref())))
                    .child(el("td").text(or_dash(row.unit_name.as_deref())))
                    .child(el("td").text(fix_name_spacing(row.customer_name.as_deref())))
                    .child(el("td").text(format_currency(row.commission_value)))
                    .child(el("td").text(format_currency(row.valor_pago)))
                    .child(trigger_cell(row.atingiu_gatilho))
                    .child(el("td").child(badge(installment.badge(), installment.label())))
                    .child(el("td").child(badge(approval.badge(), approval.label())))
                    .child(el("td").text(format_date(row.commission_date.as_deref())))
                    .into()
            })
            .collect()
    };

    table("tabela-relatorio", header_cells(&REPORT_HEADERS), body)
}

pub fn report_page(report: &CommissionReport, notice: Option<&Notice>) -> String {
    let query = form_query(&report.query().to_pairs());
    let body = vec![
        hero(
            "Relatório de Comissões",
            vec![
                format!("Registros: {}", report.rows().len()),
                format!("Valor total: {}", format_currency_or_zero(Some(report.total_value()))),
            ],
        ),
        card(
            "Filtros",
            [report_filters(report.filters(), report.period(), &query)],
        ),
        card("Comissões", [report_table(report.rows())]),
    ];

    document("Relatório", Nav::Relatorio, notice, body)
}

pub fn approval_table(rows: &[Commission], selection: &Selection) -> Node {
    let mut headers = vec![select_all_header()];
    headers.extend(header_cells(&APPROVAL_HEADERS[1..]));

    let body = if rows.is_empty() {
        vec![empty_row(
            APPROVAL_HEADERS.len(),
            "Nenhuma comissão pendente de aprovação",
        )]
    } else {
        rows.iter()
            .map(|row| {
                el("tr")
                    .attr("data-id", row.id.to_string())
                    .child(el("td").child(row_checkbox(row, selection)))
                    .child(el("td").text(fix_name_spacing(row.broker_nome.as_deref())))
                    .child(el("td").text(or_dash(row.enterprise_name.as_deref())))
                    .child(el("td").text(or_dash(row.unit_name.as_deref())))
                    .child(el("td").text(fix_name_spacing(row.customer_name.as_deref())))
                    .child(el("td").text(format_currency(row.commission_value)))
                    .child(el("td").text(format_date(row.commission_date.as_deref())))
                    .child(trigger_cell(row.atingiu_gatilho))
                    .child(el("td").text(format_date(row.data_envio_aprovacao.as_deref())))
                    .into()
            })
            .collect()
    };

    table("tabela-direcao", headers, body)
}

fn reject_dialog(open: bool) -> Node {
    el("dialog")
        .id("reject-dialog")
        .flag("open", open)
        .child(el("h2").text("Rejeitar comissões"))
        .child(
            el("label")
                .attr("for", "motivo-rejeicao")
                .text("Motivo da rejeição"),
        )
        .child(
            el("textarea")
                .id("motivo-rejeicao")
                .attr("name", "motivo")
                .flag("required", true),
        )
        .child(
            el("div")
                .class("batch-actions")
                .child(
                    el("button")
                        .class("btn btn-danger")
                        .attr("type", "button")
                        .attr("data-endpoint", REJECT_ENDPOINT)
                        .attr("data-payload", "reject")
                        .text("Confirmar rejeição"),
                )
                .child(
                    el("button")
                        .class("btn btn-ghost")
                        .attr("type", "button")
                        .attr("data-close-dialog", "reject-dialog")
                        .text("Cancelar"),
                ),
        )
        .into()
}

pub fn approval_page(queue: &ApprovalQueue, notice: Option<&Notice>) -> String {
    let stats = queue.stats();
    let body = vec![
        hero(
            "Aprovação de Comissões",
            vec![
                format!("Pendentes: {}", stats.pending),
                format!("Valor total: {}", format_currency_or_zero(Some(stats.total_value))),
            ],
        ),
        card(
            "Pendentes de aprovação",
            [
                approval_table(queue.rows(), queue.selection()),
                el("div")
                    .class("batch-actions")
                    .child(el("span").attr("data-selected-count", "").text("0"))
                    .child(el("span").text(" selecionada(s) · "))
                    .child(
                        el("span")
                            .attr("data-selected-value", "")
                            .text(format_currency_or_zero(Some(queue.selected_value()))),
                    )
                    .into(),
                el("div")
                    .class("batch-actions")
                    .child(
                        el("textarea")
                            .id("observacoes-aprovacao")
                            .attr("placeholder", "Observações (opcional)"),
                    )
                    .child(
                        el("button")
                            .class("btn")
                            .attr("type", "button")
                            .attr("data-endpoint", APPROVE_ENDPOINT)
                            .attr("data-payload", "approve")
                            .attr("data-confirm", "Confirma a aprovação de {n} comissão(ões)?")
                            .text("Aprovar selecionadas"),
                    )
                    .child(
                        el("button")
                            .class("btn btn-danger")
                            .attr("type", "button")
                            .attr("data-open-dialog", "reject-dialog")
                            .text("Rejeitar selecionadas"),
                    )
                    .into(),
            ],
        ),
        reject_dialog(queue.is_reject_dialog_open()),
    ];

    document("Direção", Nav::Direcao, notice, body)
}

fn info_item(label: &str, value: impl Into<String>) -> Node {
    info_value(label, el("div").class("info-value").text(value))
}

fn info_value(label: &str, value: Element) -> Node {
    el("div")
        .class("info-item")
        .child(el("div").class("info-label").text(label))
        .child(value)
        .into()
}

pub fn contract_info_card(info: &ContractInfo) -> Node {
    let reached = info.atingiu_gatilho;
    card(
        "Contrato",
        [
            el("div")
                .class("info-grid")
                .child(info_item("Contrato", or_dash(Some(info.numero_contrato.as_str()))))
                .child(info_item("Cliente", fix_name_spacing(info.nome_cliente.as_deref())))
                .child(info_item(
                    "Corretor",
                    fix_name_spacing(info.corretor_principal.as_deref()),
                ))
                .child(info_item(
                    "Empreendimento",
                    or_dash(info.empreendimento_nome.as_deref()),
                ))
                .child(info_item("Data do contrato", format_date(info.data_contrato.as_deref())))
                .child(info_item("Valor da comissão", format_currency(info.valor_comissao)))
                .child(info_item("Valor total", format_currency(info.valor_total)))
                .child(info_item("Valor à vista", format_currency(info.cash_value())))
                .child(info_item("ITBI", format_currency(info.valor_itbi)))
                .child(info_item("Valor pago", format_currency(info.valor_pago)))
                .into(),
            el("div")
                .class("info-grid")
                .id("gatilho-info")
                .child(info_item("Regra de gatilho", info.trigger_rule()))
                .child(info_item("Valor do gatilho", format_currency(info.valor_gatilho)))
                .child(info_value(
                    "Atingiu gatilho",
                    el("div")
                        .class(if reached {
                            "info-value gatilho-sim"
                        } else {
                            "info-value gatilho-nao"
                        })
                        .text(yes_no_upper(reached)),
                ))
                .into(),
        ],
    )
}

fn select_field(
    name: &'static str,
    prompt: &str,
    options: impl IntoIterator<Item = (String, String)>,
    selected: Option<&str>,
) -> Node {
    el("select")
        .attr("name", name)
        .attr("data-autosubmit", "")
        .child(el("option").attr("value", "").text(prompt))
        .children(options.into_iter().map(|(value, label)| {
            let chosen = selected == Some(value.as_str());
            el("option")
                .attr("value", value)
                .flag("selected", chosen)
                .text(label)
                .into()
        }))
        .into()
}

/// Enterprise and contract selectors, the lot search box and the detail card.
pub fn contracts_page(
    enterprises: &[Enterprise],
    building_id: Option<&str>,
    contracts: &[ContractOption],
    numero_contrato: Option<&str>,
    info: Option<&ContractInfo>,
    notice: Option<&Notice>,
) -> String {
    let enterprise_options = enterprises.iter().filter_map(|enterprise| {
        enterprise
            .lookup_id()
            .map(|id| (id.to_string(), enterprise.nome.clone()))
    });
    let contract_options = contracts
        .iter()
        .map(|option| (option.value.clone(), option.label.clone()));

    let mut form = el("form")
        .class("filters")
        .attr("method", "get")
        .attr("action", "/dashboard/contratos")
        .child(select_field(
            "building_id",
            "Selecione um empreendimento",
            enterprise_options,
            building_id,
        ));
    if building_id.is_some() {
        form = form.child(select_field(
            "numero_contrato",
            "Selecione um contrato",
            contract_options,
            numero_contrato,
        ));
    }

    let lot_search = el("div")
        .class("filters")
        .child(
            el("input")
                .attr("type", "search")
                .id("busca-lote")
                .attr("placeholder", "Buscar por lote")
                .attr("data-lot-search", "/dashboard/lotes")
                .attr("autocomplete", "off"),
        )
        .child(el("div").id("resultados-lote"));

    let mut body = vec![
        hero(
            "Contratos",
            vec![format!("Empreendimentos: {}", enterprises.len())],
        ),
        card("Buscar por lote", [lot_search.into()]),
        card("Empreendimento", [form.into()]),
    ];
    if let Some(info) = info {
        body.push(contract_info_card(info));
    }

    document("Contratos", Nav::Contratos, notice, body)
}

/// Autocomplete entries linking to the contract detail.
pub fn lot_suggestions(suggestions: &[LotSuggestion]) -> Node {
    if suggestions.is_empty() {
        return el("div")
            .class("autocomplete-item")
            .text("Nenhum resultado encontrado")
            .into();
    }

    el("div")
        .class("autocomplete-results")
        .children(suggestions.iter().map(|item| {
            let href = match item.building_id.as_deref() {
                Some(building_id) => format!(
                    "/dashboard/contratos?{}",
                    form_query(&[
                        ("building_id".to_string(), building_id.to_string()),
                        ("numero_contrato".to_string(), item.numero_contrato.clone()),
                    ])
                ),
                None => "/dashboard/contratos".to_string(),
            };
            el("a")
                .class("autocomplete-item")
                .attr("href", href)
                .attr("data-numero", item.numero_contrato.clone())
                .attr("data-building", item.building_id.clone().unwrap_or_default())
                .child(el("strong").text(item.lot_label.clone()))
                .text(format!(" - {}", item.customer))
                .child(el("br"))
                .child(el("small").text(format!(
                    "{} - Contrato: {}",
                    item.enterprise.as_deref().unwrap_or_default(),
                    item.numero_contrato
                )))
                .into()
        }))
        .into()
}

pub fn broker_contracts(contracts: &[BrokerContract]) -> Node {
    if contracts.is_empty() {
        return el("p")
            .class("empty")
            .text("Nenhum contrato encontrado para este corretor.")
            .into();
    }

    el("div")
        .class("contratos-corretor")
        .children(contracts.iter().map(|contract| {
            el("div")
                .class("contrato-item")
                .child(
                    el("div")
                        .class("contrato-header")
                        .child(el("strong").text(format!(
                            "{} - Lote {}",
                            or_dash(contract.numero_contrato.as_deref()),
                            or_dash(contract.unidade.as_deref())
                        )))
                        .child(el("div").text(or_dash(contract.empreendimento.as_deref()))),
                )
                .child(
                    el("div")
                        .class("info-grid")
                        .child(info_item("Cliente", fix_name_spacing(contract.cliente.as_deref())))
                        .child(info_item("Comissão", format_currency(contract.valor_comissao)))
                        .child(info_item(
                            "Status",
                            translate_installment_status(contract.status_parcela.as_deref()),
                        ))
                        .child(info_value(
                            "Gatilho",
                            el("div")
                                .class(if contract.atingiu_gatilho {
                                    "info-value gatilho-sim"
                                } else {
                                    "info-value"
                                })
                                .text(format!("Atingido: {}", yes_no(contract.atingiu_gatilho))),
                        )),
                )
                .into()
        }))
        .into()
}

pub fn brokers_page(
    brokers: &[Broker],
    selected: Option<&Broker>,
    contracts: Option<&[BrokerContract]>,
    notice: Option<&Notice>,
) -> String {
    let options = brokers.iter().filter_map(|broker| {
        broker
            .lookup_id()
            .map(|id| (id.to_string(), fix_name_spacing(Some(&broker.nome))))
    });
    let form = el("form")
        .class("filters")
        .attr("method", "get")
        .attr("action", "/dashboard/corretores")
        .child(select_field(
            "corretor_id",
            "Selecione um corretor",
            options,
            selected.and_then(Broker::lookup_id),
        ));

    let mut body = vec![
        hero("Corretores", vec![format!("Corretores: {}", brokers.len())]),
        card("Corretor", [form.into()]),
    ];
    if let (Some(broker), Some(contracts)) = (selected, contracts) {
        body.push(card(
            &format!("Contratos de {}", fix_name_spacing(Some(&broker.nome))),
            [broker_contracts(contracts)],
        ));
    }

    document("Corretores", Nav::Corretores, notice, body)
}

fn unavailable(what: &str) -> Node {
    el("p")
        .class("section-error")
        .text(format!("Erro ao carregar {what}."))
        .into()
}

fn login_or_never(raw: Option<&str>) -> String {
    match raw.filter(|value| !value.is_empty()) {
        Some(raw) => format_date(Some(raw)),
        None => "Nunca".to_string(),
    }
}

fn field(label: &str, input: Element) -> Node {
    el("label").text(format!("{label} ")).child(input).into()
}

fn submit_button(label: &str) -> Node {
    el("button").attr("type", "submit").class("btn").text(label).into()
}

fn profile_select(selected: &str) -> Element {
    el("select")
        .attr("name", "perfil")
        .children(User::PROFILES.iter().map(|profile| {
            el("option")
                .attr("value", *profile)
                .flag("selected", *profile == selected)
                .text(*profile)
                .into()
        }))
}

/// JSON form handled by the page script: fields are sent to `endpoint`.
fn action_form(endpoint: impl Into<String>, method: &str) -> Element {
    el("form")
        .class("filters")
        .attr("data-endpoint", endpoint)
        .attr("data-method", method)
}

pub fn new_user_form() -> Node {
    action_form(USERS_ENDPOINT, "POST")
        .id("form-usuario")
        .child(field(
            "Username",
            el("input").attr("type", "text").attr("name", "username").flag("required", true),
        ))
        .child(field(
            "Senha",
            el("input").attr("type", "password").attr("name", "senha").flag("required", true),
        ))
        .child(field(
            "Nome completo",
            el("input")
                .attr("type", "text")
                .attr("name", "nome_completo")
                .flag("required", true),
        ))
        .child(field("Perfil", profile_select(User::DEFAULT_PROFILE)))
        .child(field(
            "Administrador",
            el("input").attr("type", "checkbox").attr("name", "is_admin"),
        ))
        .child(submit_button("Criar usuário"))
        .into()
}

pub fn users_table(users: &[User]) -> Node {
    if users.is_empty() {
        return el("p").class("empty").text("Nenhum usuário cadastrado.").into();
    }
    table(
        "tabela-usuarios",
        header_cells(&["Nome", "Username", "Perfil", "Admin", "Último Login", "Alterar perfil"]),
        users
            .iter()
            .map(|user| {
                el("tr")
                    .attr("data-id", user.id.to_string())
                    .child(el("td").text(or_dash(user.nome_completo.as_deref())))
                    .child(el("td").text(user.username.clone()))
                    .child(el("td").text(user.profile()))
                    .child(el("td").text(yes_no(user.is_admin)))
                    .child(el("td").text(login_or_never(user.ultimo_login.as_deref())))
                    .child(
                        el("td").child(
                            action_form(format!("{USERS_ENDPOINT}/{}/perfil", user.id), "PUT")
                                .child(profile_select(user.profile()))
                                .child(submit_button("Salvar")),
                        ),
                    )
                    .into()
            })
            .collect(),
    )
}

pub fn broker_accounts_table(accounts: &[BrokerAccount]) -> Node {
    if accounts.is_empty() {
        return el("p").class("empty").text("Nenhum corretor cadastrado.").into();
    }
    table(
        "tabela-corretores",
        header_cells(&["Nome", "CPF", "E-mail", "Último Login"]),
        accounts
            .iter()
            .map(|account| {
                el("tr")
                    .child(el("td").text(account.nome.clone()))
                    .child(el("td").text(account.cpf.clone()))
                    .child(el("td").text(or_dash(account.email.as_deref())))
                    .child(el("td").text(login_or_never(account.ultimo_login.as_deref())))
                    .into()
            })
            .collect(),
    )
}

pub fn email_lists(configs: &[EmailConfig]) -> Node {
    el("div")
        .class("config-emails")
        .children(configs.iter().map(|config| {
            el("div")
                .class("config-email-card")
                .attr("data-tipo", config.tipo.clone())
                .child(el("h3").text(config.title()))
                .child(
                    el("div")
                        .class("config-email-lista")
                        .children(config.emails.iter().map(|email| {
                            el("span").class("email-tag").text(email.clone()).into()
                        })),
                )
                .child(
                    action_form(format!("/dashboard/emails/{}", config.tipo), "PUT")
                        .child(
                            el("textarea")
                                .attr("name", "emails")
                                .attr("placeholder", "E-mails separados por vírgula")
                                .text(config.emails.join(", ")),
                        )
                        .child(submit_button("Salvar")),
                )
                .into()
        }))
        .into()
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{}%", format_decimal(Some(value))),
        None => PLACEHOLDER.to_string(),
    }
}

fn number_value(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

fn percent_input(name: &'static str, value: Option<f64>) -> Element {
    el("input")
        .attr("type", "number")
        .attr("name", name)
        .attr("min", "0")
        .attr("max", "100")
        .attr("step", "0.01")
        .attr("value", number_value(value))
}

/// Creates a rule, or edits `rule` in place when given.
pub fn rule_form(rule: Option<&CommissionRule>) -> Node {
    let form = match rule {
        Some(rule) => action_form(format!("{RULES_ENDPOINT}/{}", rule.id), "PUT"),
        None => action_form(RULES_ENDPOINT, "POST"),
    };
    let kind = rule.map(|rule| rule.tipo).unwrap_or_default();
    let kinds = [RuleKind::Gatilho, RuleKind::Faturamento].map(|option| -> Node {
        el("option")
            .attr("value", option.label().to_lowercase())
            .flag("selected", option == kind)
            .text(option.label())
            .into()
    });

    form.child(field(
        "Nome",
        el("input")
            .attr("type", "text")
            .attr("name", "nome")
            .attr("value", rule.map(|rule| rule.nome.clone()).unwrap_or_default())
            .flag("required", true),
    ))
    .child(field(
        "Descrição",
        el("input")
            .attr("type", "text")
            .attr("name", "descricao")
            .attr(
                "value",
                rule.and_then(|rule| rule.descricao.clone()).unwrap_or_default(),
            ),
    ))
    .child(field("Tipo", el("select").attr("name", "tipo").children(kinds)))
    .child(field(
        "Percentual",
        percent_input("percentual", rule.and_then(|rule| rule.percentual)),
    ))
    .child(field(
        "Auditoria",
        percent_input(
            "percentual_auditoria",
            rule.and_then(|rule| rule.percentual_auditoria),
        ),
    ))
    .child(field(
        "Inclui ITBI",
        el("input")
            .attr("type", "checkbox")
            .attr("name", "inclui_itbi")
            .flag("checked", rule.map_or(true, |rule| rule.inclui_itbi)),
    ))
    .child(submit_button("Salvar regra"))
    .into()
}

fn delete_rule_button(id: i64) -> Node {
    el("button")
        .class("btn btn-danger")
        .attr("type", "button")
        .attr("data-endpoint", format!("{RULES_ENDPOINT}/{id}"))
        .attr("data-method", "DELETE")
        .attr("data-payload", "none")
        .attr("data-confirm", "Deseja realmente excluir esta regra?")
        .text("Excluir")
        .into()
}

pub fn rules_table(rules: &[CommissionRule]) -> Node {
    if rules.is_empty() {
        return el("p").class("empty").text("Nenhuma regra cadastrada.").into();
    }
    table(
        "tabela-regras",
        header_cells(&["Nome", "Tipo", "Percentual", "Auditoria", "Inclui ITBI", "Ativa", "Ações"]),
        rules
            .iter()
            .map(|rule| {
                el("tr")
                    .attr("data-id", rule.id.to_string())
                    .attr("title", rule.descricao.clone().unwrap_or_default())
                    .child(el("td").text(rule.nome.clone()))
                    .child(el("td").text(rule.tipo.label()))
                    .child(el("td").text(percent(rule.percentual)))
                    .child(el("td").text(percent(rule.percentual_auditoria)))
                    .child(el("td").text(yes_no(rule.inclui_itbi)))
                    .child(el("td").text(yes_no(rule.ativo)))
                    .child(
                        el("td")
                            .child(
                                el("details")
                                    .child(el("summary").text("Editar"))
                                    .child(rule_form(Some(rule))),
                            )
                            .child(delete_rule_button(rule.id)),
                    )
                    .into()
            })
            .collect(),
    )
}

pub fn sync_status(last: Option<&SyncLog>) -> Node {
    let summary = match last {
        Some(log) => format!(
            "Última sincronização: {} ({})",
            format_date(log.data_sincronizacao.as_deref()),
            or_dash(log.status.as_deref())
        ),
        None => "Nenhuma sincronização registrada".to_string(),
    };

    el("div")
        .class("batch-actions")
        .child(el("span").id("sync-status").text(summary))
        .child(
            el("button")
                .class("btn")
                .attr("type", "button")
                .attr("data-endpoint", SYNC_ENDPOINT)
                .attr("data-payload", "sync")
                .attr("data-confirm", "Deseja sincronizar os dados agora?")
                .text("Sincronizar agora"),
        )
        .into()
}

pub fn settings_page(snapshot: &SettingsSnapshot, notice: Option<&Notice>) -> String {
    let body = vec![
        hero("Configurações", Vec::new()),
        card("Sincronização", [sync_status(snapshot.last_sync.as_ref())]),
        card(
            "Usuários",
            [
                snapshot
                    .users
                    .as_deref()
                    .map_or_else(|| unavailable("usuários"), users_table),
                new_user_form(),
            ],
        ),
        card(
            "Corretores",
            [snapshot
                .broker_accounts
                .as_deref()
                .map_or_else(|| unavailable("corretores"), broker_accounts_table)],
        ),
        card(
            "E-mails de notificação",
            [snapshot
                .email_configs
                .as_deref()
                .map_or_else(|| unavailable("configurações de e-mail"), email_lists)],
        ),
        card(
            "Regras de comissão",
            [
                snapshot
                    .rules
                    .as_deref()
                    .map_or_else(|| unavailable("regras"), rules_table),
                rule_form(None),
            ],
        ),
    ];

    document("Configurações", Nav::Configuracoes, notice, body)
}

/// `application/x-www-form-urlencoded` query string.
pub fn form_query(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
