//! Per-command executors, grouped the way the commands group: movement,
//! editing, type-out, Q-registers, searching, files, paging, flow control,
//! and flag registers.

use crate::command::Command;
use crate::tables::Exec;
use crate::Engine;
use core_model::{Error, Result};

mod edit_cmds;
mod file_cmds;
mod flag_cmds;
mod flow_cmds;
mod move_cmds;
mod page_cmds;
mod qreg_cmds;
mod search_cmds;
mod type_cmds;

pub(crate) fn dispatch(eng: &mut Engine, cmd: &mut Command, what: Exec) -> Result<()> {
    use Exec::*;
    match what {
        CtrlA => type_cmds::exec_ctrl_a(eng, cmd),
        CtrlC => flow_cmds::exec_ctrl_c(eng, cmd),
        CtrlD => flag_cmds::exec_ctrl_d(eng, cmd),
        CtrlEFlag => flag_cmds::exec_ctrl_e(eng, cmd),
        CtrlI => edit_cmds::exec_tab(eng, cmd),
        CtrlNFlag => flag_cmds::exec_ctrl_n(eng, cmd),
        CtrlO => flag_cmds::exec_ctrl_o(eng, cmd),
        CtrlQ => move_cmds::exec_ctrl_q(eng, cmd),
        CtrlRFlag => flag_cmds::exec_ctrl_r(eng, cmd),
        CtrlT => type_cmds::exec_ctrl_t(eng, cmd),
        CtrlU => qreg_cmds::exec_ctrl_u(eng, cmd),
        CtrlXFlag => flag_cmds::exec_ctrl_x(eng, cmd),
        Escape => flow_cmds::exec_escape(eng, cmd),
        Bang => flow_cmds::exec_bang(eng, cmd),
        Quote => flow_cmds::exec_quote(eng, cmd),
        Apos => flow_cmds::exec_apos(eng, cmd),
        Pipe => flow_cmds::exec_pipe(eng, cmd),
        Pct => qreg_cmds::exec_pct(eng, cmd),
        Semi => flow_cmds::exec_semi(eng, cmd),
        LessThan => flow_cmds::exec_loop_start(eng, cmd),
        Equals => type_cmds::exec_equals(eng, cmd),
        GreaterThan => flow_cmds::exec_loop_end(eng, cmd),
        Trace => flag_cmds::exec_trace(eng, cmd),
        A => page_cmds::exec_a(eng, cmd),
        C => move_cmds::exec_c(eng, cmd),
        D => edit_cmds::exec_d(eng, cmd),
        G => qreg_cmds::exec_g(eng, cmd),
        I => edit_cmds::exec_i(eng, cmd),
        J => move_cmds::exec_j(eng, cmd),
        K => edit_cmds::exec_k(eng, cmd),
        L => move_cmds::exec_l(eng, cmd),
        M => qreg_cmds::exec_m(eng, cmd),
        N => search_cmds::exec_n(eng, cmd),
        O => flow_cmds::exec_o(eng, cmd),
        P => page_cmds::exec_p(eng, cmd),
        Q => qreg_cmds::exec_q(eng, cmd),
        R => move_cmds::exec_r(eng, cmd),
        S => search_cmds::exec_s(eng, cmd),
        T => type_cmds::exec_t(eng, cmd),
        U => qreg_cmds::exec_u(eng, cmd),
        V => type_cmds::exec_v(eng, cmd),
        W | FDisplay => Err(Error::NotConfigured),
        X => qreg_cmds::exec_x(eng, cmd),
        Y => page_cmds::exec_y(eng, cmd, true),
        Bslash => edit_cmds::exec_bslash(eng, cmd),
        Push => qreg_cmds::exec_push(eng, cmd),
        Pop => qreg_cmds::exec_pop(eng, cmd),
        Underscore => search_cmds::exec_underscore(eng, cmd),
        EPct => file_cmds::exec_e_pct(eng, cmd),
        E1 => flag_cmds::exec_e1(eng, cmd),
        E2 => flag_cmds::exec_e2(eng, cmd),
        E3 => flag_cmds::exec_e3(eng, cmd),
        E4 => flag_cmds::exec_e4(eng, cmd),
        EA => file_cmds::exec_ea(eng, cmd),
        EB => file_cmds::exec_eb(eng, cmd),
        EC => file_cmds::exec_ec(eng, cmd),
        ED => flag_cmds::exec_ed(eng, cmd),
        EE => flag_cmds::exec_ee(eng, cmd),
        EF => file_cmds::exec_ef(eng, cmd),
        EG => file_cmds::exec_eg(eng, cmd),
        EH => flag_cmds::exec_eh(eng, cmd),
        EI => file_cmds::exec_ei(eng, cmd),
        EK => file_cmds::exec_ek(eng, cmd),
        EL => file_cmds::exec_el(eng, cmd),
        EN => file_cmds::exec_en(eng, cmd),
        EO => flag_cmds::exec_eo(eng, cmd),
        EP => file_cmds::exec_ep(eng, cmd),
        EQ => file_cmds::exec_eq(eng, cmd),
        ER => file_cmds::exec_er(eng, cmd),
        ES => flag_cmds::exec_es(eng, cmd),
        ET => flag_cmds::exec_et(eng, cmd),
        EU => flag_cmds::exec_eu(eng, cmd),
        EV => flag_cmds::exec_ev(eng, cmd),
        EW => file_cmds::exec_ew(eng, cmd),
        EX => file_cmds::exec_ex(eng, cmd),
        EY => page_cmds::exec_y(eng, cmd, false),
        EZ => file_cmds::exec_ez(eng, cmd),
        EUnderscore => search_cmds::exec_e_underscore(eng, cmd),
        FApos => flow_cmds::exec_f_apos(eng, cmd),
        FLt => flow_cmds::exec_f_lt(eng, cmd),
        FGt => flow_cmds::exec_f_gt(eng, cmd),
        FPipe => flow_cmds::exec_f_pipe(eng, cmd),
        FB => search_cmds::exec_fb(eng, cmd),
        FC => search_cmds::exec_fc(eng, cmd),
        FD => search_cmds::exec_fd(eng, cmd),
        FK => search_cmds::exec_fk(eng, cmd),
        FL => edit_cmds::exec_fl(eng, cmd),
        FN => search_cmds::exec_fn(eng, cmd),
        FR => search_cmds::exec_fr(eng, cmd),
        FS => search_cmds::exec_fs(eng, cmd),
        FU => edit_cmds::exec_fu(eng, cmd),
        FUnderscore => search_cmds::exec_f_underscore(eng, cmd),
    }
}
